//! Access control and consumption accounting.
//!
//! This module provides the request-path core:
//! - [`AccessResolver`]: login → namespace → share → password entry
//! - [`UsageLedger`]: decrements the matched entry after a full delivery
//!
//! # Concurrency
//!
//! Resolution loads a fresh descriptor snapshot and the ledger saves that same
//! snapshot after mutating it. Without namespace locking, two requests that
//! both read `left: 1` can both deliver, and the later save overwrites the
//! earlier one. See [`crate::locks`] for the serialized variant.

pub mod ledger;
pub mod resolver;

pub use ledger::{Consumption, UsageLedger};
pub use resolver::{AccessError, AccessResolver, ResolvedShare};
