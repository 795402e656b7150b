//! Lightweight admin HTTP server
//!
//! Exposes `/healthz` and `/metrics`, with the metrics body produced by the caller.

use axum::http::StatusCode;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub type MetricsFn = fn() -> (StatusCode, String);

async fn healthz() -> &'static str {
    "OK"
}

/// Router serving the admin endpoints.
pub fn admin_router(metrics_fn: MetricsFn) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(move || async move { metrics_fn() }))
}

/// Bind `addr` and serve the admin router on the current runtime.
/// Bind errors are returned; serve errors are logged when the task ends.
pub async fn spawn_admin_server(
    addr: &str,
    metrics_fn: MetricsFn,
) -> anyhow::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, "admin server listening");
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, admin_router(metrics_fn)).await {
            error!(error = %e, "admin server stopped");
        }
    }))
}
