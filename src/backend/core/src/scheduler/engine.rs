//! The contract the control plane requires from a scheduling engine.
//!
//! [`SchedulerEngine`] is everything the controller may ask of an engine:
//! lifecycle, job/trigger queries and mutations, and listener registration.
//! [`EngineFactory`] hands out the engine handle; acquiring it may fail, which
//! is what startup retries around.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::key::{JobKey, TriggerKey};
use super::listener::JobListener;
use super::model::{EngineMetadata, JobDetail, ScheduleError, Trigger, TriggerState};
use crate::error::{CadenceError, ErrorCode};

// ═══════════════════════════════════════════════════════════════════════════════
// Engine Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Job {0} does not exist")]
    JobNotFound(JobKey),

    #[error("Trigger {0} does not exist")]
    TriggerNotFound(TriggerKey),

    #[error("Trigger {trigger} references unknown job {job}")]
    MissingJobForTrigger { trigger: TriggerKey, job: JobKey },

    #[error("Job {0} already exists")]
    JobAlreadyExists(JobKey),

    #[error("Trigger {0} already exists")]
    TriggerAlreadyExists(TriggerKey),

    #[error("Job type '{0}' is not registered")]
    UnknownJobType(String),

    #[error("Trigger {0} will never fire")]
    TriggerWillNeverFire(TriggerKey),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("The scheduler has been shut down")]
    Shutdown,

    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl From<EngineError> for CadenceError {
    fn from(error: EngineError) -> Self {
        let code = match &error {
            EngineError::JobNotFound(_) => ErrorCode::JobNotFound,
            EngineError::TriggerNotFound(_) => ErrorCode::TriggerNotFound,
            EngineError::Schedule(_) => ErrorCode::InvalidSchedule,
            EngineError::Shutdown => ErrorCode::SchedulerShutDown,
            _ => ErrorCode::EngineError,
        };
        CadenceError::new(code, error.to_string()).with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait SchedulerEngine: Send + Sync {
    fn scheduler_name(&self) -> &str;

    fn instance_id(&self) -> &str;

    /// True once started, including while in standby.
    async fn is_started(&self) -> bool;

    async fn is_shutdown(&self) -> bool;

    async fn in_standby_mode(&self) -> bool;

    async fn metadata(&self) -> EngineResult<EngineMetadata>;

    /// Start (or resume from standby) firing triggers.
    async fn start(&self) -> EngineResult<()>;

    /// Stop firing triggers; running executions continue.
    async fn standby(&self) -> EngineResult<()>;

    /// Terminal. Waits for running executions when `wait_for_jobs` is set.
    async fn shutdown(&self, wait_for_jobs: bool) -> EngineResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    async fn job_group_names(&self) -> EngineResult<Vec<String>>;

    async fn job_keys(&self, group: &str) -> EngineResult<Vec<JobKey>>;

    async fn job_detail(&self, key: &JobKey) -> EngineResult<Option<JobDetail>>;

    async fn triggers_of_job(&self, key: &JobKey) -> EngineResult<Vec<Trigger>>;

    async fn trigger_group_names(&self) -> EngineResult<Vec<String>>;

    async fn trigger_keys(&self, group: &str) -> EngineResult<Vec<TriggerKey>>;

    async fn trigger(&self, key: &TriggerKey) -> EngineResult<Option<Trigger>>;

    async fn trigger_state(&self, key: &TriggerKey) -> EngineResult<TriggerState>;

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a job with its triggers, replacing existing ones when `replace` is set.
    async fn schedule_job(
        &self,
        job: JobDetail,
        triggers: Vec<Trigger>,
        replace: bool,
    ) -> EngineResult<()>;

    async fn pause_job(&self, key: &JobKey) -> EngineResult<()>;

    async fn resume_job(&self, key: &JobKey) -> EngineResult<()>;

    /// Fire the job once, now.
    async fn trigger_job(&self, key: &JobKey) -> EngineResult<()>;

    /// Remove the job and all of its triggers.
    async fn delete_job(&self, key: &JobKey) -> EngineResult<()>;

    async fn pause_trigger(&self, key: &TriggerKey) -> EngineResult<()>;

    async fn resume_trigger(&self, key: &TriggerKey) -> EngineResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Listeners
    // ─────────────────────────────────────────────────────────────────────────

    fn job_listener_names(&self) -> Vec<String>;

    fn add_job_listener(&self, listener: Arc<dyn JobListener>);

    fn remove_job_listener(&self, name: &str) -> bool;
}

/// Source of the engine handle.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn engine(&self) -> EngineResult<Arc<dyn SchedulerEngine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_codes() {
        let error: CadenceError = EngineError::JobNotFound(JobKey::with_default_group("x")).into();
        assert_eq!(error.code(), ErrorCode::JobNotFound);
        assert_eq!(error.message(), "Job DEFAULT.x does not exist");

        let error: CadenceError = EngineError::Shutdown.into();
        assert_eq!(error.code(), ErrorCode::SchedulerShutDown);

        let error: CadenceError = EngineError::Unavailable("store offline".into()).into();
        assert_eq!(error.code(), ErrorCode::EngineError);
        assert_eq!(error.http_status().as_u16(), 500);
    }
}
