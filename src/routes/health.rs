use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::models::RecordingStatus;
use crate::AppState;

/// Root endpoint - basic status
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Zeus Recorder",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "runtime": "rust"
    }))
}

/// Recording counters for the health response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordingStats {
    total: usize,
    completed: usize,
    failed: usize,
    active_captures: usize,
    armed_schedules: usize,
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    uptime: u64,
    storage: bool,
    recordings: RecordingStats,
}

async fn storage_ok(state: &AppState) -> bool {
    tokio::fs::metadata(state.engine.store().data_dir())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// GET /health - Advanced health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    let storage = storage_ok(&state).await;

    let recordings = state.engine.get_recordings().await;
    let count = |status: RecordingStatus| recordings.iter().filter(|r| r.status == status).count();

    let stats = RecordingStats {
        total: recordings.len(),
        completed: count(RecordingStatus::Completed),
        failed: count(RecordingStatus::Failed),
        active_captures: state.engine.active().len(),
        armed_schedules: state.scheduler.armed_count(),
    };

    Json(HealthResponse {
        status: if storage { "ok" } else { "unhealthy" }.to_string(),
        uptime,
        storage,
        recordings: stats,
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"Internal Server Error".to_vec(),
            )
        }
    }
}

/// Readiness probe (for Kubernetes)
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if storage_ok(&state).await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready - storage unavailable")
    }
}

/// Liveness probe (for Kubernetes)
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}
