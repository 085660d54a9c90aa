//! Response bodies for resolved shares.
//!
//! This module provides:
//! - [`selector`]: picks raw file streaming or a directory archive
//! - [`archive`]: streaming tar.gz production for directories
//! - [`tracked`]: a body wrapper that reports whether the stream completed
//!
//! Bodies are produced as they are sent; neither files nor archives are
//! buffered in full.

pub mod archive;
pub mod selector;
pub mod tracked;

pub use selector::{prepare, Delivery, DeliveryError, DeliveryKind};
pub use tracked::{DeliveryOutcome, TrackedStream};

use bytes::Bytes;
use futures_util::stream::BoxStream;

/// A response body: a fallible stream of byte chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;
