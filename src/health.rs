//! HTTP server for health checks and metrics

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use crate::metrics::IngestMetrics;

/// Routes for `/health` and `/metrics`
pub fn router(metrics: Arc<IngestMetrics>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

/// Serve the health routes on all interfaces
pub async fn serve(port: u16, metrics: Arc<IngestMetrics>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(metrics)).await?;
    Ok(())
}

async fn health_check(State(metrics): State<Arc<IngestMetrics>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "component": "mbo-book",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "records_read": metrics.records_read.get(),
        "records_skipped": metrics.records_skipped.get(),
        "events_applied": metrics.events_applied.get(),
        "snapshots_published": metrics.snapshots_published.get(),
        "sink_failures": metrics.sink_failures.get(),
    }))
}

async fn render_metrics(
    State(metrics): State<Arc<IngestMetrics>>,
) -> std::result::Result<String, (StatusCode, String)> {
    metrics
        .render()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
