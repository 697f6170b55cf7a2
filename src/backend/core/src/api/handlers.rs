//! API request handlers.
//!
//! Handlers return `Result<impl IntoResponse, CadenceError>`; failures are
//! rendered by the `IntoResponse` implementation on `CadenceError`, so no
//! handler builds an error body itself.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::models::{
    HistoryPage, HistoryQuery, LifecycleResponse, LoginRequest, LoginResponse, MessageResponse,
    ShutdownQuery, DEFAULT_HISTORY_COUNT,
};
use super::AppState;
use crate::auth::AuthError;
use crate::error::CadenceError;
use crate::middleware::AuthContext;

// ═══════════════════════════════════════════════════════════════════════════════
// Health and Metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let lifecycle = state.controller.lifecycle_state();
    let (status, label) = if lifecycle.is_ready() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status,
        Json(json!({
            "status": label,
            "state": lifecycle,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authentication
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, CadenceError> {
    let issued = state
        .auth
        .authenticate(&req.username, &req.password)
        .ok_or(AuthError::InvalidCredentials)?;

    Ok(Json(LoginResponse {
        token: issued.token,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler Lifecycle
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn scheduler_status(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CadenceError> {
    Ok(Json(state.controller.status().await?))
}

pub async fn start_scheduler(
    State(state): State<AppState>,
    caller: AuthContext,
) -> Result<impl IntoResponse, CadenceError> {
    info!(username = %caller.username, "Start requested");
    let changed = state.controller.start_scheduler().await?;
    Ok(Json(LifecycleResponse::new(
        changed,
        "Scheduler started",
        "Scheduler already running",
    )))
}

pub async fn standby_scheduler(
    State(state): State<AppState>,
    caller: AuthContext,
) -> Result<impl IntoResponse, CadenceError> {
    info!(username = %caller.username, "Standby requested");
    let changed = state.controller.standby().await?;
    Ok(Json(LifecycleResponse::new(
        changed,
        "Scheduler in standby mode",
        "Scheduler already in standby mode",
    )))
}

pub async fn shutdown_scheduler(
    State(state): State<AppState>,
    caller: AuthContext,
    ApiQuery(query): ApiQuery<ShutdownQuery>,
) -> Result<impl IntoResponse, CadenceError> {
    let wait = query.wait_for_jobs_to_complete.unwrap_or(true);
    info!(username = %caller.username, wait_for_jobs = wait, "Shutdown requested");
    let changed = state.controller.shutdown(wait).await?;
    Ok(Json(LifecycleResponse::new(
        changed,
        "Scheduler shutdown",
        "Scheduler already shutdown",
    )))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Jobs
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, CadenceError> {
    Ok(Json(state.controller.list_jobs().await?))
}

pub async fn job_history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> impl IntoResponse {
    let count = query.count.unwrap_or(DEFAULT_HISTORY_COUNT);
    Json(HistoryPage::from(state.controller.recent_history(count)))
}

pub async fn pause_job(
    State(state): State<AppState>,
    ApiPath(job_key): ApiPath<String>,
) -> Result<impl IntoResponse, CadenceError> {
    let key = state.controller.pause_job(&job_key).await?;
    Ok(Json(MessageResponse::new(format!("Job {key} paused"))))
}

pub async fn resume_job(
    State(state): State<AppState>,
    ApiPath(job_key): ApiPath<String>,
) -> Result<impl IntoResponse, CadenceError> {
    let key = state.controller.resume_job(&job_key).await?;
    Ok(Json(MessageResponse::new(format!("Job {key} resumed"))))
}

pub async fn trigger_job(
    State(state): State<AppState>,
    ApiPath(job_key): ApiPath<String>,
) -> Result<impl IntoResponse, CadenceError> {
    let key = state.controller.trigger_job(&job_key).await?;
    Ok(Json(MessageResponse::new(format!("Job {key} triggered"))))
}

pub async fn delete_job(
    State(state): State<AppState>,
    ApiPath(job_key): ApiPath<String>,
) -> Result<impl IntoResponse, CadenceError> {
    let key = state.controller.delete_job(&job_key).await?;
    Ok(Json(MessageResponse::new(format!("Job {key} deleted"))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Triggers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_triggers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CadenceError> {
    Ok(Json(state.controller.list_triggers().await?))
}

pub async fn pause_trigger(
    State(state): State<AppState>,
    ApiPath(trigger_key): ApiPath<String>,
) -> Result<impl IntoResponse, CadenceError> {
    let key = state.controller.pause_trigger(&trigger_key).await?;
    Ok(Json(MessageResponse::new(format!("Trigger {key} paused"))))
}

pub async fn resume_trigger(
    State(state): State<AppState>,
    ApiPath(trigger_key): ApiPath<String>,
) -> Result<impl IntoResponse, CadenceError> {
    let key = state.controller.resume_trigger(&trigger_key).await?;
    Ok(Json(MessageResponse::new(format!("Trigger {key} resumed"))))
}
