//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// `*` allows any origin; anything else is taken as a single exact origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!(origin, error = %e, "Invalid CORS_ORIGIN, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(api::health::health))
        // Scheduler
        .route("/api/scheduler/status", get(api::scheduler::status))
        .route("/api/scheduler/queues", get(api::scheduler::queues))
        .route("/api/scheduler/history", get(api::scheduler::history))
        .route("/api/scheduler/submit", post(api::scheduler::submit))
        .route("/api/scheduler/submit-group", post(api::scheduler::submit_group))
        .route("/api/scheduler/cancel/{task_id}", post(api::scheduler::cancel))
        .route("/api/scheduler/pause", post(api::scheduler::pause))
        .route("/api/scheduler/resume", post(api::scheduler::resume))
        .route("/api/scheduler/safe-mode", post(api::scheduler::safe_mode))
        .route("/api/scheduler/concurrency", post(api::scheduler::concurrency))
        // Diagnostics
        .route("/api/resources/diagnose", get(api::diagnostics::diagnose))
        .route("/api/resources/quick-wins", get(api::diagnostics::quick_wins))
        .route(
            "/api/resources/system-profile",
            get(api::diagnostics::system_profile),
        )
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
