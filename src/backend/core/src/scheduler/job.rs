//! Job definitions and traits.
//!
//! This module provides the abstractions for defining background jobs:
//!
//! - **Job trait**: The interface every schedulable job implements
//! - **JobExecutionContext**: What a job (and every listener) sees about a fire
//! - **JobExecutionError**: Failure reported by a job
//! - **JobFactory**: Resolves a registered job type name to an instance

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::key::{JobKey, TriggerKey};
use super::model::JobDataMap;

// ═══════════════════════════════════════════════════════════════════════════════
// Job Error
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for job execution failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecutionError {
    /// Error message
    pub message: String,
    /// Optional error code
    pub code: Option<String>,
}

impl JobExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Add an error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for JobExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for JobExecutionError {}

/// Result type for job execution.
pub type JobResult = std::result::Result<(), JobExecutionError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Execution Context
// ═══════════════════════════════════════════════════════════════════════════════

/// A single fire of a trigger for a job.
#[derive(Debug, Clone)]
pub struct JobExecutionContext {
    /// Unique id of this fire
    pub fire_instance_id: String,
    pub job_key: JobKey,
    pub job_type: String,
    pub trigger_key: TriggerKey,
    /// When the fire actually happened
    pub fire_time: DateTime<Utc>,
    /// When the trigger was scheduled to fire
    pub scheduled_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub data: JobDataMap,
    /// Set by the engine once the job returns
    pub job_run_time: Option<Duration>,
}

impl JobExecutionContext {
    pub fn new(job_key: JobKey, job_type: impl Into<String>, trigger_key: TriggerKey) -> Self {
        Self {
            fire_instance_id: Uuid::new_v4().to_string(),
            job_key,
            job_type: job_type.into(),
            trigger_key,
            fire_time: Utc::now(),
            scheduled_fire_time: None,
            previous_fire_time: None,
            next_fire_time: None,
            data: JobDataMap::new(),
            job_run_time: None,
        }
    }

    /// Look up a value in the job data map.
    pub fn data_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait implemented by every schedulable job.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct ReportJob;
///
/// #[async_trait]
/// impl Job for ReportJob {
///     async fn execute(&self, ctx: &JobExecutionContext) -> JobResult {
///         tracing::info!(job_key = %ctx.job_key, "building report");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync {
    async fn execute(&self, ctx: &JobExecutionContext) -> JobResult;
}

/// Creates job instances by registered type name.
pub trait JobFactory: Send + Sync {
    fn new_job(&self, job_type: &str) -> Option<Arc<dyn Job>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_display() {
        let error = JobExecutionError::new("upstream timed out").with_code("TIMEOUT");
        assert_eq!(error.to_string(), "upstream timed out (code: TIMEOUT)");
    }

    #[test]
    fn test_context_defaults() {
        let ctx = JobExecutionContext::new(
            JobKey::with_default_group("SampleJob"),
            "SampleJob",
            TriggerKey::with_default_group("SampleJob-trigger"),
        );

        assert!(!ctx.fire_instance_id.is_empty());
        assert!(ctx.job_run_time.is_none());
        assert!(ctx.data_value("missing").is_none());
    }
}
