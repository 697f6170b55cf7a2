#![allow(clippy::result_large_err)]
//! # Cadence Core
//!
//! Control plane for a background job scheduling engine.
//!
//! ## Architecture
//!
//! - **Scheduler**: job/trigger model, the engine contract and an in-memory engine
//! - **Controller**: lifecycle state machine and the single point of engine access
//! - **History**: bounded, newest-first log of job executions
//! - **Auth**: single-identity login issuing HS256 bearer tokens
//! - **API**: axum routes for status, lifecycle, jobs and triggers
//! - **Telemetry**: structured logging, optional OTLP tracing, Prometheus metrics

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod middleware;
pub mod retry;
pub mod scheduler;
pub mod telemetry;

pub use error::{CadenceError, ErrorCode, ErrorContext, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, AppState};
    pub use crate::auth::{AuthGateway, Claims};
    pub use crate::config::{Config, JobConfig, TriggerConfig};
    pub use crate::controller::{LifecycleState, SchedulerController, SchedulerStatus};
    pub use crate::error::{CadenceError, ErrorCode, ErrorContext, Result};
    pub use crate::retry::{BackoffStrategy, RetryPolicy};
    pub use crate::scheduler::{
        EngineFactory, EngineSettings, ExecutionHistoryRecorder, ExecutionRecord,
        InMemoryEngine, InMemoryEngineFactory, Job, JobExecutionContext, JobExecutionError,
        JobKey, JobListener, JobRegistry, SchedulerEngine, TriggerKey,
    };
}
