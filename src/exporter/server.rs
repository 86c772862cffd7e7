//! HTTP server for the Prometheus scrape endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur during scrape server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the scrape server.
#[derive(Debug, Clone)]
pub struct ExporterServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for ExporterServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 8000).into(),
        }
    }
}

impl ExporterServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// HTTP server exposing a registry in Prometheus text format.
pub struct ExporterServer {
    config: ExporterServerConfig,
    registry: Registry,
}

impl ExporterServer {
    /// Creates a new scrape server over the given registry.
    pub fn new(config: ExporterServerConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down. Metrics are
    /// served on `/metrics` and, for compatibility with older scrape
    /// configs, on `/` as well.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/", get(metrics_handler))
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.registry);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "Listening for metrics"
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the scrape endpoint. Gathering invokes every registered
/// collector, so this is where the sensor read pass happens.
async fn metrics_handler(State(registry): State<Registry>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buffer = Vec::new();

    match encoder.encode(&families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ExporterServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8000);
    }

    #[test]
    fn test_config_with_port() {
        let config = ExporterServerConfig::with_port(9100);
        assert_eq!(config.bind_addr.port(), 9100);
    }
}
