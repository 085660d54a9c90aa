//! HTTP surface of the daemon.
//!
//! A single endpoint: `POST /` with form fields `login`, `share` and `pass`
//! runs the access and delivery flow, any other request gets the HTML form.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::{AppState, ShareRequest};
pub use server::{router, serve};
