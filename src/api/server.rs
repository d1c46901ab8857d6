//! API server lifecycle — bind, spawn background task, return a handle
//! with a shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api::router::analysis_api_router;
use crate::core_state::CoreState;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the serve task to finish (after `shutdown`).
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind the analysis API and serve it on a background task.
///
/// Binding to port 0 picks an ephemeral port; the resolved address is
/// on the returned handle.
pub async fn start_api_server(
    core: Arc<CoreState>,
    bind_addr: SocketAddr,
) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {bind_addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to read server address: {e}"))?;

    tracing::info!(%addr, "API server binding");

    let app = analysis_api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "API server exited with error");
        }
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::pipeline::analysis::{InMemoryJobStore, MockAiClient};
    use serde_json::json;

    fn test_state() -> Arc<CoreState> {
        Arc::new(CoreState::with_parts(
            RuntimeConfig::from_env(),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(MockAiClient::new(json!({"summary": "served"}))),
        ))
    }

    #[tokio::test]
    async fn server_binds_ephemeral_port_and_serves_health() {
        let mut server = start_api_server(test_state(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(server.addr.port(), 0);

        let url = format!("http://{}/health", server.addr);
        let response = reqwest::get(&url).await.unwrap();
        assert!(response.status().is_success());

        server.shutdown();
        server.join().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_api_server(test_state(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        server.shutdown();
        server.shutdown();
        server.join().await;
    }
}
