//! Bounded record of recent job executions.
//!
//! The recorder is registered with the engine as a [`JobListener`]; every
//! completed execution lands at the head of a fixed-capacity deque and the
//! oldest entry falls off the tail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::job::{JobExecutionContext, JobExecutionError};
use super::listener::JobListener;

/// Capacity used when none is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Listener name the controller checks before registering.
pub const HISTORY_LISTENER_NAME: &str = "ExecutionHistoryRecorder";

/// Outcome of one execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub job_key: String,
    pub job_name: String,
    pub job_group: String,
    pub trigger_key: String,
    pub trigger_name: String,
    pub trigger_group: String,
    pub fire_time: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionRecord {
    fn from_execution(ctx: &JobExecutionContext, error: Option<&JobExecutionError>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_key: ctx.job_key.to_string(),
            job_name: ctx.job_key.name.clone(),
            job_group: ctx.job_key.group.clone(),
            trigger_key: ctx.trigger_key.to_string(),
            trigger_name: ctx.trigger_key.name.clone(),
            trigger_group: ctx.trigger_key.group.clone(),
            fire_time: ctx.fire_time,
            duration: ctx.job_run_time.unwrap_or_default(),
            success: error.is_none(),
            error_message: error.map(|e| e.message.clone()),
        }
    }
}

pub struct ExecutionHistoryRecorder {
    records: Mutex<VecDeque<ExecutionRecord>>,
    capacity: usize,
}

impl ExecutionHistoryRecorder {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Insert at the head, evicting from the tail past capacity.
    pub fn record(&self, record: ExecutionRecord) {
        let mut records = self.records.lock();
        records.push_front(record);
        records.truncate(self.capacity);
    }

    /// Up to `count` newest records, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<ExecutionRecord> {
        let records = self.records.lock();
        records.iter().take(count).cloned().collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for ExecutionHistoryRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[async_trait]
impl JobListener for ExecutionHistoryRecorder {
    fn name(&self) -> &str {
        HISTORY_LISTENER_NAME
    }

    async fn job_to_be_executed(&self, ctx: &JobExecutionContext) {
        debug!(
            job_key = %ctx.job_key,
            trigger_key = %ctx.trigger_key,
            fire_instance_id = %ctx.fire_instance_id,
            "Job about to execute"
        );
    }

    async fn job_execution_vetoed(&self, ctx: &JobExecutionContext) {
        info!(
            job_key = %ctx.job_key,
            trigger_key = %ctx.trigger_key,
            "Job execution vetoed"
        );
    }

    async fn job_was_executed(&self, ctx: &JobExecutionContext, error: Option<&JobExecutionError>) {
        let record = ExecutionRecord::from_execution(ctx, error);

        let outcome = if record.success { "success" } else { "failure" };
        counter!(
            "cadence_job_executions_total",
            "job" => record.job_key.clone(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!("cadence_job_duration_seconds", "job" => record.job_key.clone())
            .record(record.duration.as_secs_f64());

        debug!(
            job_key = %record.job_key,
            success = record.success,
            duration_ms = record.duration.as_millis() as u64,
            "Execution recorded"
        );

        self.record(record);
    }
}
