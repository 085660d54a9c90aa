//! # ushare Daemon Library
//!
//! This crate provides the server side of ushare: password-gated, use-limited
//! downloads of files and directories described by per-login YAML files.
//!
//! ## Overview
//!
//! A request carries `(login, share, pass)`. The daemon:
//!
//! - **Resolves** the login to a namespace root, loads that namespace's
//!   descriptor and finds the share and a non-exhausted matching password
//! - **Delivers** the share: a regular file as-is, a directory as a streamed
//!   `<share>.tar.gz`
//! - **Consumes** one use of the password once the body was fully sent, and
//!   rewrites the descriptor
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     HTTP (axum, POST /)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │   Access     │──▶│   Delivery   │──▶│   Usage Ledger   │  │
//! │  │   Resolver   │   │   Selector   │   │                  │  │
//! │  └──────┬───────┘   └──────────────┘   └────────┬─────────┘  │
//! │         │                                       │            │
//! │  ┌──────▼───────────────────────────────────────▼─────────┐  │
//! │  │        Descriptor Store (<root>/shares.yaml)           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/ushare/config.yaml")?;
//!     config.validate()?;
//!
//!     daemon::http::serve(&config, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`registry`]: Login → namespace root mapping
//! - [`store`]: Descriptor file load/save
//! - [`access`]: Access resolution and usage ledger
//! - [`delivery`]: File streaming and directory archiving
//! - [`locks`]: Optional per-namespace serialization
//! - [`http`]: Router, handlers and error mapping

pub mod access;
pub mod config;
pub mod delivery;
pub mod http;
pub mod locks;
pub mod registry;
pub mod store;

// Re-export descriptor for convenience
pub use descriptor;

pub use config::{Config, ConfigError, LockingMode, UshareEntry};

pub use access::{AccessError, AccessResolver, Consumption, ResolvedShare, UsageLedger};

pub use delivery::{Delivery, DeliveryError, DeliveryKind, DeliveryOutcome};

pub use http::{router, ApiError, AppState};

pub use locks::NamespaceLocks;
pub use registry::{Namespace, NamespaceRegistry};
pub use store::{DescriptorError, DescriptorStore};
