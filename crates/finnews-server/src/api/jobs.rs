use std::time::Duration;

use axum::{body::Bytes, extract::State, Extension, Json};
use finnews_core::RunStats;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::scheduler::{SchedulerError, SchedulerStatus};

use super::{map_pipeline_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct StartRequest {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct StartedData {
    running: bool,
    interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct StoppedData {
    running: bool,
}

fn map_scheduler_error(request_id: String, error: &SchedulerError) -> ApiError {
    match error {
        SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        SchedulerError::InvalidInterval => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        SchedulerError::Pipeline(e) => map_pipeline_error(request_id, e),
        SchedulerError::Job(e) => {
            tracing::error!(error = %e, "job scheduler failure");
            ApiError::new(request_id, "internal_error", "job scheduler failure")
        }
    }
}

/// The body is optional; an empty body starts with the configured interval.
fn parse_start_request(request_id: &str, body: &[u8]) -> Result<StartRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("invalid request body: {e}"),
        )
    })
}

pub(super) async fn start(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<StartedData>>, ApiError> {
    let request = parse_start_request(&req_id.0, &body)?;
    let interval = state
        .scheduler
        .start(request.interval_secs.map(Duration::from_secs))
        .await
        .map_err(|e| map_scheduler_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        StartedData {
            running: true,
            interval_secs: interval.as_secs(),
        },
        req_id.0,
    )))
}

pub(super) async fn stop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StoppedData>>, ApiError> {
    state
        .scheduler
        .stop()
        .await
        .map_err(|e| map_scheduler_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(StoppedData { running: false }, req_id.0)))
}

pub(super) async fn status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SchedulerStatus>> {
    Json(ApiResponse::new(state.scheduler.status().await, req_id.0))
}

pub(super) async fn run_now(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RunStats>>, ApiError> {
    let stats = state
        .scheduler
        .run_now()
        .await
        .map_err(|e| map_scheduler_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(stats, req_id.0)))
}
