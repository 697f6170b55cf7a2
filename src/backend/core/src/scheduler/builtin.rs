//! Built-in jobs.

use async_trait::async_trait;
use tracing::info;

use super::job::{Job, JobExecutionContext, JobResult};

/// Job: log a heartbeat line.
///
/// Reads an optional `message` from the job data map.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatJob;

#[async_trait]
impl Job for HeartbeatJob {
    async fn execute(&self, ctx: &JobExecutionContext) -> JobResult {
        let message = ctx
            .data_value("message")
            .and_then(|v| v.as_str())
            .unwrap_or("alive");

        info!(
            job_key = %ctx.job_key,
            trigger_key = %ctx.trigger_key,
            fire_time = %ctx.fire_time,
            message,
            "Heartbeat"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::key::{JobKey, TriggerKey};

    #[tokio::test]
    async fn test_heartbeat_succeeds() {
        let mut ctx = JobExecutionContext::new(
            JobKey::with_default_group("HeartbeatJob"),
            "HeartbeatJob",
            TriggerKey::with_default_group("HeartbeatJob-trigger"),
        );
        ctx.data.insert("message".into(), serde_json::json!("ping"));

        assert!(HeartbeatJob.execute(&ctx).await.is_ok());
    }
}
