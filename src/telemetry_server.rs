//! HTTP server for the Prometheus telemetry endpoint
//!
//! Serves `/metrics` and `/health` on a dedicated port for scraping.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Telemetry HTTP server
pub struct TelemetryServer;

impl TelemetryServer {
    /// Start the telemetry server on the given address
    ///
    /// Returns a JoinHandle that can be used to abort the server. The
    /// server runs until aborted or the process exits.
    pub fn start(addr: SocketAddr) -> JoinHandle<()> {
        tokio::spawn(async move {
            let app = Router::new()
                .route("/metrics", get(metrics_handler))
                .route("/health", get(health_handler));

            info!(%addr, "telemetry server starting");

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    error!(error = %e, %addr, "failed to bind telemetry server");
                    return;
                }
            };

            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "telemetry server error");
            }
        })
    }
}

async fn metrics_handler() -> impl IntoResponse {
    let body = crate::telemetry::gather();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
