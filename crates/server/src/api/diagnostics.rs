//! Resource diagnostics endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;

use tiergate_diagnostics::{Diagnosis, QuickWin, SystemProfile};
use tiergate_scheduler::clock::rfc3339_ms;

use crate::state::AppState;

use super::{api_error, ApiError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickWinsResponse {
    pub ok: bool,
    pub quick_wins: Vec<QuickWin>,
    #[serde(serialize_with = "rfc3339_ms::serialize")]
    pub ts: u64,
}

#[derive(Serialize)]
pub struct SystemProfileResponse {
    pub ok: bool,
    pub profile: SystemProfile,
    #[serde(serialize_with = "rfc3339_ms::serialize")]
    pub ts: u64,
}

/// Run every rule set now and return the full diagnosis.
#[utoipa::path(
    get,
    path = "/api/resources/diagnose",
    tag = "Diagnostics",
    responses(
        (status = 200, description = "Findings sorted by severity, with quick wins and system profile", body = Object),
        (status = 500, description = "Diagnosis task failed", body = super::ErrorResponse)
    )
)]
pub async fn diagnose(State(state): State<Arc<AppState>>) -> Result<Json<Diagnosis>, ApiError> {
    let diagnosis = off_runtime(state, |state| state.diagnostics.diagnose()).await?;
    Ok(Json(diagnosis))
}

/// Immediate fixes from the last diagnosis (computed on first call).
#[utoipa::path(
    get,
    path = "/api/resources/quick-wins",
    tag = "Diagnostics",
    responses((status = 200, description = "Up to five immediate fixes", body = Object))
)]
pub async fn quick_wins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QuickWinsResponse>, ApiError> {
    let latest = off_runtime(state, |state| state.diagnostics.latest()).await?;
    Ok(Json(QuickWinsResponse {
        ok: true,
        quick_wins: latest.quick_wins,
        ts: latest.ts,
    }))
}

#[utoipa::path(
    get,
    path = "/api/resources/system-profile",
    tag = "Diagnostics",
    responses((status = 200, description = "Host and scheduler profile", body = Object))
)]
pub async fn system_profile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemProfileResponse>, ApiError> {
    let latest = off_runtime(state, |state| state.diagnostics.latest()).await?;
    Ok(Json(SystemProfileResponse {
        ok: true,
        profile: latest.system_profile,
        ts: latest.ts,
    }))
}

/// Host probing and rule evaluation take std locks and read `/proc`, so
/// they run on the blocking pool.
async fn off_runtime(
    state: Arc<AppState>,
    f: impl FnOnce(&AppState) -> Diagnosis + Send + 'static,
) -> Result<Diagnosis, ApiError> {
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!(error = %e, "Diagnosis task failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Diagnosis failed: {e}"))
        })
}
