//! HTTP API for the scheduler dashboard.
//!
//! Every dashboard route lives under `/{route_prefix}/api`. Login is public;
//! everything else requires a bearer token. `/health` and `/metrics` sit at
//! the root, outside the prefix and without authentication.
//!
//! # Routes
//!
//! ```text
//! POST   /auth/login
//! GET    /scheduler/status
//! POST   /scheduler/start | /scheduler/standby | /scheduler/shutdown
//! GET    /jobs
//! GET    /jobs/history?count=N
//! POST   /jobs/{jobKey}/pause | /resume | /trigger
//! DELETE /jobs/{jobKey}
//! GET    /triggers
//! POST   /triggers/{triggerKey}/pause | /resume
//! ```

pub mod extract;
mod handlers;
pub mod models;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthGateway;
use crate::config::ServerConfig;
use crate::controller::SchedulerController;
use crate::middleware::{panic_response, translate_errors, AuthLayer};
use crate::telemetry::metrics::MetricsRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SchedulerController>,
    pub auth: Arc<AuthGateway>,
    pub metrics: MetricsRegistry,
}

/// Build the API router.
///
/// # Example
///
/// ```rust,ignore
/// let state = AppState { controller, auth, metrics };
/// let app = build_router(state, &config.server);
/// ```
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    with_middleware(routes(&state, server)).with_state(state)
}

/// Every route, without the outer middleware stack.
pub fn routes(state: &AppState, server: &ServerConfig) -> Router<AppState> {
    let public = Router::new().route("/auth/login", post(handlers::login));

    let protected = Router::new()
        .route("/scheduler/status", get(handlers::scheduler_status))
        .route("/scheduler/start", post(handlers::start_scheduler))
        .route("/scheduler/standby", post(handlers::standby_scheduler))
        .route("/scheduler/shutdown", post(handlers::shutdown_scheduler))
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/history", get(handlers::job_history))
        .route("/jobs/:job_key", delete(handlers::delete_job))
        .route("/jobs/:job_key/pause", post(handlers::pause_job))
        .route("/jobs/:job_key/resume", post(handlers::resume_job))
        .route("/jobs/:job_key/trigger", post(handlers::trigger_job))
        .route("/triggers", get(handlers::list_triggers))
        .route("/triggers/:trigger_key/pause", post(handlers::pause_trigger))
        .route("/triggers/:trigger_key/resume", post(handlers::resume_trigger))
        .route_layer(AuthLayer::new(Arc::clone(&state.auth)));

    Router::new()
        // Unauthenticated, outside the route prefix
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest(&server.api_base(), public.merge(protected))
}

/// Wrap `router` in panic capture, the trace id boundary, request tracing,
/// compression and CORS.
pub fn with_middleware(router: Router<AppState>) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        // Panics are caught inside the trace id scope
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_middleware::from_fn(translate_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
