pub mod health;
pub mod recordings;
pub mod schedules;

use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::RecordingError;
use crate::models::ApiResponse;
use crate::AppState;

/// Error half of every fallible handler
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

/// Map an engine/scheduler error to a status code and JSON body
pub(crate) fn api_error(context: &str, err: RecordingError) -> ApiError {
    let status = match &err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        RecordingError::TerminalState { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("{}: {}", context, err);
    } else {
        tracing::debug!("{}: {}", context, err);
    }

    (status, Json(ApiResponse::error(err.to_string())))
}

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        // Recordings
        .route(
            "/api/recordings",
            get(recordings::list_recordings).post(recordings::start_recording),
        )
        .route(
            "/api/recordings/categories",
            get(recordings::get_categories),
        )
        .route(
            "/api/recordings/:id",
            get(recordings::get_recording).delete(recordings::delete_recording),
        )
        .route(
            "/api/recordings/:id/stop",
            post(recordings::stop_recording),
        )
        // Schedules
        .route(
            "/api/schedules",
            get(schedules::list_schedules).post(schedules::create_schedule),
        )
        .route("/api/schedules/program", post(schedules::schedule_program))
        .route(
            "/api/schedules/:id/toggle",
            post(schedules::toggle_schedule),
        )
        .route(
            "/api/schedules/:id",
            delete(schedules::cancel_schedule),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
