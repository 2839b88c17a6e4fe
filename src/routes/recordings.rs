//! Recording API endpoints
//!
//! Immediate captures: start, stop, inspect and delete recordings.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{api_error, bad_request, ApiError};
use crate::models::{
    ApiResponse, CreatedResponse, RecordingCategory, RecordingOptions, RecordingStatus,
};
use crate::AppState;

/// Query params for listing recordings
#[derive(Debug, Default, Deserialize)]
pub struct RecordingsQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

/// Request to start recording a channel now
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingRequest {
    pub channel_name: String,
    pub channel_id: String,
    pub stream_url: String,
    /// Minutes; the configured default when omitted
    pub duration: Option<u32>,
    #[serde(flatten)]
    pub options: RecordingOptions,
}

/// GET /api/recordings - List recordings, optionally filtered
pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = match query.category.as_deref() {
        Some(name) => Some(
            RecordingCategory::from_name(name)
                .ok_or_else(|| bad_request(format!("Unknown category: {}", name)))?,
        ),
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(name) => Some(
            RecordingStatus::from_name(name)
                .ok_or_else(|| bad_request(format!("Unknown status: {}", name)))?,
        ),
        None => None,
    };

    let recordings: Vec<_> = state
        .engine
        .get_recordings()
        .await
        .into_iter()
        .filter(|r| category.map_or(true, |c| r.category == c))
        .filter(|r| status.map_or(true, |s| r.status == s))
        .collect();

    Ok(Json(ApiResponse::success(recordings)))
}

/// POST /api/recordings - Start an immediate capture
pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StartRecordingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let duration = payload
        .duration
        .unwrap_or(state.config.default_duration_minutes);

    let id = state
        .engine
        .start_recording(
            &payload.channel_name,
            &payload.channel_id,
            &payload.stream_url,
            duration,
            payload.options,
        )
        .await
        .map_err(|e| api_error("Failed to start recording", e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

/// GET /api/recordings/categories - Completed recordings per category
pub async fn get_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(
        state.engine.get_categories_with_recordings().await,
    ))
}

/// GET /api/recordings/:id
pub async fn get_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recording = state
        .engine
        .get_recording(&id)
        .await
        .map_err(|e| api_error("Failed to get recording", e))?;

    Ok(Json(ApiResponse::success(recording)))
}

/// POST /api/recordings/:id/stop - Stop a capture, keeping the partial file
pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = &state.engine;

    engine
        .get_recording(&id)
        .await
        .map_err(|e| api_error("Failed to stop recording", e))?;
    engine
        .stop_recording(&id)
        .await
        .map_err(|e| api_error("Failed to stop recording", e))?;

    let recording = engine
        .get_recording(&id)
        .await
        .map_err(|e| api_error("Failed to stop recording", e))?;

    Ok(Json(ApiResponse::success(recording)))
}

/// DELETE /api/recordings/:id - Delete a recording and its file
pub async fn delete_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_recording(&id)
        .await
        .map_err(|e| api_error("Failed to delete recording", e))?;

    Ok(Json(serde_json::json!({ "success": true })))
}
