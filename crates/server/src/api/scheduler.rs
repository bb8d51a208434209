//! Scheduler endpoints: status, queue listings, history, submission and
//! runtime control.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tiergate_scheduler::{
    GroupOptions, ParallelGroup, PerClass, QueueListing, ResourceTier, SchedulerError,
    SchedulerStatus, TaskClass, TaskOptions, TaskStatus, TaskSummary,
};

use crate::state::AppState;

use super::{api_error, parse_body, ApiError};

const DEFAULT_HISTORY_LIMIT: usize = 20;

fn submission_error(e: SchedulerError) -> ApiError {
    match e {
        SchedulerError::EmptyGroup | SchedulerError::DuplicateTask(_) => {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        other => {
            warn!(error = %other, "Task submission failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub status: SchedulerStatus,
}

#[derive(Serialize)]
pub struct QueuesResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub queues: QueueListing,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub ok: bool,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Serialize)]
pub struct SubmittedTask {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub tier: ResourceTier,
    pub status: TaskStatus,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub task: SubmittedTask,
}

#[derive(Serialize)]
pub struct GroupResponse {
    pub ok: bool,
    pub group: ParallelGroup,
}

#[derive(Serialize)]
pub struct CancelledTask {
    pub id: String,
    pub status: TaskStatus,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub ok: bool,
    pub task: CancelledTask,
}

#[derive(Serialize)]
pub struct PauseResponse {
    pub ok: bool,
    pub paused: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeModeResponse {
    pub ok: bool,
    pub safe_mode_active: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyResponse {
    pub ok: bool,
    pub concurrency_limits: PerClass<usize>,
}

// ── Request types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Kept as text so junk falls back to the default instead of rejecting.
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGroupRequest {
    pub tasks: Vec<TaskOptions>,
    #[serde(flatten)]
    pub options: GroupOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct SafeModeRequest {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyRequest {
    pub task_class: Option<String>,
    pub limit: Option<usize>,
}

// ── Handlers ─────────────────────────────────────────────────────

/// Queue sizes, running counts, limits, flags and counters.
#[utoipa::path(
    get,
    path = "/api/scheduler/status",
    tag = "Scheduler",
    responses((status = 200, description = "Scheduler status snapshot", body = Object))
)]
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ok: true,
        status: state.scheduler.status(),
    })
}

#[utoipa::path(
    get,
    path = "/api/scheduler/queues",
    tag = "Scheduler",
    responses((status = 200, description = "Queued and running tasks per class", body = Object))
)]
pub async fn queues(State(state): State<Arc<AppState>>) -> Json<QueuesResponse> {
    Json(QueuesResponse {
        ok: true,
        queues: state.scheduler.queues(),
    })
}

/// The most recent finished tasks, oldest first.
#[utoipa::path(
    get,
    path = "/api/scheduler/history",
    tag = "Scheduler",
    params(("limit" = Option<usize>, Query, description = "How many entries to return (default 20)")),
    responses((status = 200, description = "Recent finished tasks", body = Object))
)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(HistoryResponse {
        ok: true,
        tasks: state.scheduler.history(limit),
    })
}

#[utoipa::path(
    post,
    path = "/api/scheduler/submit",
    tag = "Scheduler",
    request_body(content = Object, description = "Task options: type, priority, taskClass, riskLevel, maxLatencyMs, costCeiling, constraints, payload"),
    responses(
        (status = 200, description = "Task accepted", body = Object),
        (status = 400, description = "Malformed task options or duplicate task id", body = super::ErrorResponse)
    )
)]
pub async fn submit(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let options: TaskOptions = parse_body(&body)?;
    let task = state.scheduler.submit(options).map_err(submission_error)?;
    Ok(Json(SubmitResponse {
        ok: true,
        task: SubmittedTask {
            id: task.id,
            task_type: task.task_type,
            tier: task.resource_tier,
            status: task.status,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/scheduler/submit-group",
    tag = "Scheduler",
    request_body(content = Object, description = "{tasks: [options], executionMode?, maxConcurrency?}"),
    responses(
        (status = 200, description = "Group accepted", body = Object),
        (status = 400, description = "Malformed body or empty group", body = super::ErrorResponse)
    )
)]
pub async fn submit_group(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<GroupResponse>, ApiError> {
    let request: SubmitGroupRequest = parse_body(&body)?;
    let group = state
        .scheduler
        .submit_group(request.tasks, request.options)
        .map_err(submission_error)?;
    Ok(Json(GroupResponse { ok: true, group }))
}

/// Cancel a queued task. Running and finished tasks give 404.
#[utoipa::path(
    post,
    path = "/api/scheduler/cancel/{task_id}",
    tag = "Scheduler",
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task cancelled", body = Object),
        (status = 404, description = "Task not found in queues", body = super::ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let task = state.scheduler.cancel_task(&task_id).map_err(|e| match e {
        SchedulerError::TaskNotFound(_) => {
            api_error(StatusCode::NOT_FOUND, "Task not found in queues")
        }
        other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;
    Ok(Json(CancelResponse {
        ok: true,
        task: CancelledTask {
            id: task.id,
            status: task.status,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/scheduler/pause",
    tag = "Scheduler",
    responses((status = 200, description = "Admission paused", body = Object))
)]
pub async fn pause(State(state): State<Arc<AppState>>) -> Json<PauseResponse> {
    state.scheduler.pause();
    Json(PauseResponse {
        ok: true,
        paused: true,
    })
}

#[utoipa::path(
    post,
    path = "/api/scheduler/resume",
    tag = "Scheduler",
    responses((status = 200, description = "Admission resumed", body = Object))
)]
pub async fn resume(State(state): State<Arc<AppState>>) -> Json<PauseResponse> {
    state.scheduler.resume();
    Json(PauseResponse {
        ok: true,
        paused: false,
    })
}

#[utoipa::path(
    post,
    path = "/api/scheduler/safe-mode",
    tag = "Scheduler",
    request_body(content = Object, description = "{enabled: bool}"),
    responses(
        (status = 200, description = "Safe mode toggled", body = Object),
        (status = 400, description = "Malformed body", body = super::ErrorResponse)
    )
)]
pub async fn safe_mode(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SafeModeResponse>, ApiError> {
    let request: SafeModeRequest = parse_body(&body)?;
    state.scheduler.set_safe_mode(request.enabled);
    Ok(Json(SafeModeResponse {
        ok: true,
        safe_mode_active: state.scheduler.is_safe_mode(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/scheduler/concurrency",
    tag = "Scheduler",
    request_body(content = Object, description = "{taskClass, limit}"),
    responses(
        (status = 200, description = "Limit updated", body = Object),
        (status = 400, description = "Missing or invalid taskClass/limit", body = super::ErrorResponse)
    )
)]
pub async fn concurrency(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ConcurrencyResponse>, ApiError> {
    let request: ConcurrencyRequest = parse_body(&body)?;
    let (Some(class), Some(limit)) = (request.task_class, request.limit) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "taskClass and limit required"));
    };
    let class: TaskClass = class
        .parse()
        .map_err(|e: SchedulerError| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    info!(class = %class, limit, "Concurrency change requested over HTTP");
    state.scheduler.adjust_concurrency(class, limit);
    Ok(Json(ConcurrencyResponse {
        ok: true,
        concurrency_limits: state.scheduler.status().concurrency_limits,
    }))
}
