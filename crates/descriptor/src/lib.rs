//! # ushare Descriptor Library
//!
//! This crate defines the on-disk model that gates access to shared files and
//! directories, and the YAML codec used to read and rewrite it.
//!
//! ## Overview
//!
//! Every namespace ("ushare") owns a single descriptor file. The file holds an
//! ordered list of [`Share`] records, each pointing at a path relative to the
//! namespace root and carrying an ordered list of [`PasswordEntry`] values:
//!
//! ```text
//! list:
//!   - name: docs
//!     path: report.pdf
//!     passes:
//!       - pass: xyz
//!         left: 2      # > 0 usable, 0 exhausted, < 0 unlimited
//! ```
//!
//! The daemon rewrites this file whenever a password is consumed, so the codec
//! keeps any keys it does not understand and writes them back untouched.
//!
//! ## Example Usage
//!
//! ```rust
//! use descriptor::ShareDescriptorSet;
//!
//! let yaml = "list:\n  - name: docs\n    path: report.pdf\n    passes:\n      - pass: xyz\n        left: 2\n";
//! let mut set = ShareDescriptorSet::from_yaml(yaml).unwrap();
//!
//! let share = set.find_share("docs").unwrap();
//! let pass = set.shares[share.get()].find_password("xyz").unwrap();
//! assert!(set.entry_mut(share, pass).unwrap().consume());
//!
//! let rewritten = set.to_yaml().unwrap();
//! assert!(rewritten.contains("left: 1"));
//! ```
//!
//! ## Modules
//!
//! - [`model`]: Share, password entry and descriptor set types
//! - [`codec`]: YAML encode/decode
//! - [`error`]: Error types

pub mod codec;
pub mod error;
pub mod model;

pub use error::{CodecError, Result};
pub use model::{PasswordEntry, PasswordIndex, Share, ShareDescriptorSet, ShareIndex};

/// Default file name of a namespace's descriptor, relative to its root.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "shares.yaml";
