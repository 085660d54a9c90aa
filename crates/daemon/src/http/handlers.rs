//! Request handlers.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use super::error::ApiError;
use crate::access::{AccessResolver, UsageLedger};
use crate::config::Config;
use crate::delivery::{self, TrackedStream};
use crate::locks::NamespaceLocks;
use crate::registry::NamespaceRegistry;
use crate::store::DescriptorStore;

/// The request form served on `GET`.
pub const FORM_PAGE: &str = include_str!("../../assets/form.html");

/// Form fields of a share request. All three are required.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareRequest {
    pub login: String,
    pub share: String,
    pub pass: String,
}

/// State shared by all request handlers.
#[derive(Debug)]
pub struct AppState {
    pub resolver: AccessResolver,
    pub ledger: UsageLedger,
    pub locks: NamespaceLocks,
}

impl AppState {
    /// Wires resolver, ledger and locks from a validated configuration.
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(NamespaceRegistry::new(&config.ushares));
        let store = DescriptorStore::new(config.descriptor_file.clone());

        Self {
            resolver: AccessResolver::new(registry, store.clone()).log_secrets(config.log_secrets),
            ledger: UsageLedger::new(store),
            locks: NamespaceLocks::new(config.locking),
        }
    }
}

/// Entry point for every request.
pub async fn handle_root(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    form: Result<Form<ShareRequest>, FormRejection>,
) -> Response {
    if method != Method::POST {
        return Html(FORM_PAGE).into_response();
    }

    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            tracing::warn!("Bad form: {}", rejection);
            return ApiError::BadRequest(rejection.body_text()).into_response();
        }
    };

    match deliver_share(state, &headers, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Resolves the request and builds the streaming response.
///
/// The ledger runs from the response body once its last chunk is out.
async fn deliver_share(
    state: Arc<AppState>,
    headers: &HeaderMap,
    request: ShareRequest,
) -> Result<Response, ApiError> {
    let guard = match state.resolver.namespace_root(&request.login) {
        Some(root) => state.locks.acquire(root).await,
        None => None,
    };

    let resolved = {
        let state = state.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || {
            state
                .resolver
                .resolve(&request.login, &request.share, &request.pass)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("resolver task failed: {}", e)))??
    };

    let target = resolved.target_path();
    let delivery = delivery::prepare(&resolved, headers.get(CONTENT_TYPE))
        .await
        .map_err(|e| {
            tracing::error!(
                login = %request.login,
                share = %request.share,
                path = %target.display(),
                error = %e,
                "Cannot deliver share"
            );
            ApiError::from(e)
        })?;

    tracing::info!(
        login = %request.login,
        share = %request.share,
        kind = ?delivery.kind,
        file = %delivery.file_name,
        "Delivering share"
    );

    let label = format!("{}/{}", request.login, request.share);
    let body = TrackedStream::new(delivery.body, label)
        .expect_len(delivery.length)
        .on_delivered(move || async move {
            let ledger = state.ledger.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || ledger.consume(resolved)).await {
                tracing::error!("Usage ledger task failed: {}", e);
            }
        })
        .hold(guard);

    let mut response = Response::new(Body::from_stream(body));
    *response.headers_mut() = delivery.headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_page_has_fields() {
        assert!(FORM_PAGE.contains("name=\"login\""));
        assert!(FORM_PAGE.contains("name=\"share\""));
        assert!(FORM_PAGE.contains("name=\"pass\""));
        assert!(FORM_PAGE.contains("method=\"post\""));
    }
}
