//! Mapping of request-scoped failures to HTTP responses.
//!
//! Response bodies are generic. In particular every access failure produces
//! the same 403 response, whichever resolution step rejected the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::access::AccessError;
use crate::delivery::DeliveryError;

/// Error returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The form was missing fields or could not be decoded.
    #[error("bad form: {0}")]
    BadRequest(String),

    /// Access was denied.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A server-side condition prevented the delivery.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::BadRequest(_) => "bad form",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Internal(_) => "internal error",
        };
        (self.status(), body).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        if err.is_forbidden() {
            ApiError::Forbidden(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
