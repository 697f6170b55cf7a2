//! Callbacks raised by an engine around every job fire.

use async_trait::async_trait;

use super::job::{JobExecutionContext, JobExecutionError};

/// Observer of job executions.
///
/// Engines call listeners from their own worker tasks, never from request
/// handlers, and may call them concurrently for different fires.
#[async_trait]
pub trait JobListener: Send + Sync {
    /// Unique name; engines use it to tell listeners apart.
    fn name(&self) -> &str;

    /// The job is about to run.
    async fn job_to_be_executed(&self, _ctx: &JobExecutionContext) {}

    /// The fire was vetoed; the job did not run.
    async fn job_execution_vetoed(&self, _ctx: &JobExecutionContext) {}

    /// The job finished, successfully when `error` is `None`.
    async fn job_was_executed(&self, ctx: &JobExecutionContext, error: Option<&JobExecutionError>);
}
