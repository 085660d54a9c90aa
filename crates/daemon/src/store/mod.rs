//! Descriptor persistence.
//!
//! Each namespace root holds one descriptor file. The store reads it fresh on
//! every request and rewrites it whole after a password is consumed; there is
//! no cache and no cross-request locking at this layer.

pub mod descriptor_store;

pub use descriptor_store::{DescriptorError, DescriptorStore};
