//! API Server
//!
//! Serves the REST router until shutdown is requested.

use crate::error::{Error, Result};
use crate::metrics::SelectorMetrics;
use crate::template::TemplateFunctions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info};

use super::rest::{RestRouter, RestSettings};

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Freeze the replica index once per request
    pub frozen_snapshot: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            request_timeout_secs: 30,
            frozen_snapshot: false,
        }
    }
}

impl ApiServerConfig {
    fn rest_settings(&self) -> RestSettings {
        RestSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            frozen_snapshot: self.frozen_snapshot,
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server over the template functions
pub struct ApiServer {
    config: ApiServerConfig,
    functions: TemplateFunctions,
    metrics: Option<Arc<SelectorMetrics>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, functions: TemplateFunctions) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            functions,
            metrics: None,
            shutdown_tx,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SelectorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run the API server until shutdown
    pub async fn run(&self) -> Result<()> {
        info!("Starting pool selector API server");
        info!("  REST API: {}", self.config.rest_addr);
        info!("  Request timeout: {}s", self.config.request_timeout_secs);
        info!("  Frozen snapshot: {}", self.config.frozen_snapshot);

        let rest_handle = self.spawn_rest_server();

        match rest_handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("REST server error: {}", e);
                Err(e)
            }
            Err(e) => Err(Error::Internal(format!("REST server task failed: {}", e))),
        }
    }

    fn spawn_rest_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let addr = self.config.rest_addr;
        let mut router = RestRouter::new(self.functions.clone(), self.config.rest_settings());
        if let Some(metrics) = &self.metrics {
            router = router.with_metrics(metrics.clone());
        }
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move { run_rest_server(addr, router, shutdown_rx).await })
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Run the REST API server
async fn run_rest_server(
    addr: SocketAddr,
    router: RestRouter,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = router.build();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

    info!("REST API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("REST server shutting down");
        })
        .await
        .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

    Ok(())
}
