//! Scheduled recording API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::{api_error, ApiError};
use crate::models::{ApiResponse, CreatedResponse, EpgProgram, ScheduleOptions};
use crate::AppState;

/// Request to schedule a capture at a fixed time
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub channel_name: String,
    pub channel_id: String,
    pub stream_url: String,
    pub scheduled_time: DateTime<Utc>,
    /// Minutes
    pub duration: u32,
    #[serde(flatten)]
    pub options: ScheduleOptions,
}

/// Request to schedule a capture of an EPG program
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramScheduleRequest {
    pub channel_name: String,
    pub channel_id: String,
    pub stream_url: String,
    pub program: EpgProgram,
    #[serde(flatten)]
    pub options: ScheduleOptions,
}

/// GET /api/schedules
pub async fn list_schedules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(
        state.scheduler.get_scheduled_recordings().await,
    ))
}

/// POST /api/schedules
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .scheduler
        .schedule_recording(
            &payload.channel_name,
            &payload.channel_id,
            &payload.stream_url,
            payload.scheduled_time,
            payload.duration,
            payload.options,
        )
        .await
        .map_err(|e| api_error("Failed to schedule recording", e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

/// POST /api/schedules/program
pub async fn schedule_program(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProgramScheduleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .scheduler
        .schedule_program(
            &payload.channel_name,
            &payload.channel_id,
            &payload.stream_url,
            &payload.program,
            payload.options,
        )
        .await
        .map_err(|e| api_error("Failed to schedule program", e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

/// POST /api/schedules/:id/toggle - Enable or disable a schedule
pub async fn toggle_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let schedule = state
        .scheduler
        .toggle_scheduled_recording(&id)
        .await
        .map_err(|e| api_error("Failed to toggle schedule", e))?;

    Ok(Json(ApiResponse::success(schedule)))
}

/// DELETE /api/schedules/:id
pub async fn cancel_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .scheduler
        .cancel_scheduled_recording(&id)
        .await
        .map_err(|e| api_error("Failed to cancel schedule", e))?;

    Ok(Json(serde_json::json!({ "success": true })))
}
