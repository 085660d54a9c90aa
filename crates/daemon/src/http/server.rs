//! HTTP listener and router construction.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;

use super::handlers::{handle_root, AppState};
use crate::config::Config;

/// Builds the router. Every path is served by the same handler.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", any(handle_root))
        .fallback(handle_root)
        .with_state(state)
}

/// Binds the configured address and serves until `shutdown` resolves.
pub async fn serve<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_address()?;
    let state = Arc::new(AppState::from_config(config));

    let listener = TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
    let local_addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.clone());

    tracing::info!(
        "HTTP server listening on {} ({} ushares, locking: {:?})",
        local_addr,
        config.ushares.len(),
        config.locking
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UshareEntry;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new(
            "127.0.0.1:0",
            vec![UshareEntry::new("alice", temp_dir.path())],
        );

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            serve(&config, async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_serve_rejects_bad_listen() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new("nowhere", vec![UshareEntry::new("alice", temp_dir.path())]);

        assert!(serve(&config, std::future::pending()).await.is_err());
    }
}
