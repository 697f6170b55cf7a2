//! Scheduler control plane.
//!
//! [`SchedulerController`] is the only component that touches the engine.
//! It brings the engine up (with retries), drives the lifecycle state
//! machine, and exposes the job and trigger operations behind the API.
//!
//! Lifecycle:
//!
//! ```text
//! Stopped -> Initializing -> Running <-> Standby -> ShuttingDown -> Shutdown
//!                 |
//!                 +-> Stopped (initialization failed)
//! ```

use chrono::{DateTime, Utc};
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::JobConfig;
use crate::error::{CadenceError, ErrorCode, Result};
use crate::retry::{RetryError, RetryPolicy};
use crate::scheduler::{
    register_job_from_config, register_job_with_defaults, EngineError, EngineFactory,
    ExecutionHistoryRecorder, ExecutionRecord, JobDataMap, JobKey, MisfireInstruction, Schedule,
    SchedulerEngine, TriggerKey, TriggerState, HISTORY_LISTENER_NAME,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Stopped,
    Initializing,
    Running,
    Standby,
    ShuttingDown,
    Shutdown,
}

impl LifecycleState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Standby => "Standby",
            Self::ShuttingDown => "ShuttingDown",
            Self::Shutdown => "Shutdown",
        }
    }

    /// Whether the process can serve scheduler operations.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Running | Self::Standby)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Read Models
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub scheduler_name: String,
    pub scheduler_instance_id: String,
    pub is_started: bool,
    pub is_shutdown: bool,
    pub is_standby_mode: bool,
    pub job_store_type: String,
    pub thread_pool_type: String,
    pub thread_pool_size: usize,
    pub version: String,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_since: Option<DateTime<Utc>>,
    pub jobs_executed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_key: String,
    pub group_name: String,
    pub job_name: String,
    pub job_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub durable: bool,
    pub requests_recovery: bool,
    pub disallow_concurrent_execution: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub trigger_count: usize,
    pub job_data: JobDataMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSummary {
    pub trigger_key: String,
    pub group_name: String,
    pub trigger_name: String,
    pub job_key: String,
    pub job_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub trigger_state: TriggerState,
    pub trigger_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    /// Simple triggers only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_interval_ms: Option<u64>,
    /// Simple triggers only; -1 repeats forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<i64>,
    pub misfire_instruction: MisfireInstruction,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Controller
// ═══════════════════════════════════════════════════════════════════════════════

pub struct SchedulerController {
    engine: RwLock<Option<Arc<dyn SchedulerEngine>>>,
    state: Mutex<LifecycleState>,
    history: Arc<ExecutionHistoryRecorder>,
    factory: Arc<dyn EngineFactory>,
    retry: RetryPolicy,
    wait_for_jobs_on_stop: bool,
}

impl SchedulerController {
    pub fn new(factory: Arc<dyn EngineFactory>, history: Arc<ExecutionHistoryRecorder>) -> Self {
        Self {
            engine: RwLock::new(None),
            state: Mutex::new(LifecycleState::Stopped),
            history,
            factory,
            retry: RetryPolicy::startup(),
            wait_for_jobs_on_stop: true,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_wait_for_jobs_on_stop(mut self, wait: bool) -> Self {
        self.wait_for_jobs_on_stop = wait;
        self
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn history(&self) -> &Arc<ExecutionHistoryRecorder> {
        &self.history
    }

    fn transition(&self, to: LifecycleState) {
        let from = std::mem::replace(&mut *self.state.lock(), to);
        Self::log_transition(from, to);
    }

    /// Move `from` to `to` atomically. On mismatch returns the current state.
    fn compare_and_transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> std::result::Result<(), LifecycleState> {
        {
            let mut state = self.state.lock();
            if *state != from {
                return Err(*state);
            }
            *state = to;
        }
        Self::log_transition(from, to);
        Ok(())
    }

    fn log_transition(from: LifecycleState, to: LifecycleState) {
        if from != to {
            counter!("cadence_lifecycle_transitions_total", "to" => to.as_str()).increment(1);
            info!(from = %from, to = %to, "Scheduler lifecycle transition");
        }
    }

    /// The engine handle, cloned out of the lock.
    fn engine(&self) -> Result<Arc<dyn SchedulerEngine>> {
        self.engine
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(CadenceError::not_initialized)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Process lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Acquire the engine, register the history listener and start it.
    async fn initialize(&self) -> Result<()> {
        let engine = self.factory.engine().await?;

        let registered = engine
            .job_listener_names()
            .iter()
            .any(|name| name == HISTORY_LISTENER_NAME);
        if !registered {
            engine.add_job_listener(Arc::clone(&self.history) as _);
            info!(listener = HISTORY_LISTENER_NAME, "Execution history listener registered");
        }

        if !engine.is_started().await {
            engine.start().await?;
        }

        *self.engine.write() = Some(engine);
        Ok(())
    }

    /// Bring the scheduler up, retrying per the configured policy.
    ///
    /// Fails with `STARTUP_FAILED` once retries are exhausted or `ctx` is
    /// cancelled during a backoff wait.
    pub async fn start(&self, ctx: &CancellationToken) -> Result<()> {
        if let Err(state) =
            self.compare_and_transition(LifecycleState::Stopped, LifecycleState::Initializing)
        {
            info!(state = %state, "Scheduler already initialized");
            return Ok(());
        }

        match self
            .retry
            .execute("scheduler initialization", ctx, || self.initialize())
            .await
        {
            Ok(()) => {
                self.transition(LifecycleState::Running);
                Ok(())
            }
            Err(e) => {
                self.transition(LifecycleState::Stopped);
                Err(startup_failed(e))
            }
        }
    }

    /// Shut the engine down for process exit.
    ///
    /// Waits for running jobs when configured to; cancelling `ctx` abandons
    /// the wait.
    pub async fn stop(&self, ctx: &CancellationToken) -> Result<()> {
        let Ok(engine) = self.engine() else {
            self.transition(LifecycleState::Shutdown);
            return Ok(());
        };

        if engine.is_shutdown().await {
            self.transition(LifecycleState::Shutdown);
            return Ok(());
        }

        self.transition(LifecycleState::ShuttingDown);
        tokio::select! {
            result = engine.shutdown(self.wait_for_jobs_on_stop) => result?,
            _ = ctx.cancelled() => {
                warn!("Stop cancelled, not waiting for running jobs");
            }
        }
        self.transition(LifecycleState::Shutdown);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduler operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Start or resume. `false` when already running.
    pub async fn start_scheduler(&self) -> Result<bool> {
        let engine = self.engine()?;

        if engine.is_shutdown().await {
            return Err(EngineError::Shutdown.into());
        }
        if engine.is_started().await && !engine.in_standby_mode().await {
            return Ok(false);
        }

        engine.start().await?;
        self.transition(LifecycleState::Running);
        info!(scheduler = %engine.scheduler_name(), "Scheduler started");
        Ok(true)
    }

    /// Pause firing. `false` unless currently running.
    pub async fn standby(&self) -> Result<bool> {
        let engine = self.engine()?;

        if !engine.is_started().await || engine.in_standby_mode().await {
            return Ok(false);
        }

        engine.standby().await?;
        self.transition(LifecycleState::Standby);
        info!(scheduler = %engine.scheduler_name(), "Scheduler in standby mode");
        Ok(true)
    }

    /// Terminal shutdown. `false` when already shut down.
    pub async fn shutdown(&self, wait_for_jobs: bool) -> Result<bool> {
        let engine = self.engine()?;

        if engine.is_shutdown().await {
            return Ok(false);
        }

        self.transition(LifecycleState::ShuttingDown);
        engine.shutdown(wait_for_jobs).await?;
        self.transition(LifecycleState::Shutdown);
        info!(scheduler = %engine.scheduler_name(), wait_for_jobs, "Scheduler shutdown");
        Ok(true)
    }

    pub async fn status(&self) -> Result<SchedulerStatus> {
        let engine = self.engine()?;
        let metadata = engine.metadata().await?;

        Ok(SchedulerStatus {
            scheduler_name: metadata.scheduler_name,
            scheduler_instance_id: metadata.instance_id,
            is_started: metadata.started,
            is_shutdown: metadata.shutdown,
            is_standby_mode: metadata.standby,
            job_store_type: metadata.job_store_type,
            thread_pool_type: metadata.thread_pool_type,
            thread_pool_size: metadata.thread_pool_size,
            version: metadata.version,
            state: self.lifecycle_state(),
            running_since: metadata.running_since,
            jobs_executed: metadata.jobs_executed,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Every job, by group then name.
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let engine = self.engine()?;
        let mut summaries = Vec::new();

        let mut groups = engine.job_group_names().await?;
        groups.sort();

        for group in groups {
            let mut keys = engine.job_keys(&group).await?;
            keys.sort();

            for key in keys {
                let Some(detail) = engine.job_detail(&key).await? else {
                    continue;
                };
                let triggers = engine.triggers_of_job(&key).await?;

                summaries.push(JobSummary {
                    job_key: key.to_string(),
                    group_name: key.group.clone(),
                    job_name: key.name.clone(),
                    job_type: detail.job_type,
                    description: detail.description,
                    durable: detail.durable,
                    requests_recovery: detail.requests_recovery,
                    disallow_concurrent_execution: detail.disallow_concurrent_execution,
                    next_fire_time: triggers.iter().filter_map(|t| t.next_fire_time).max(),
                    previous_fire_time: triggers.iter().filter_map(|t| t.previous_fire_time).max(),
                    trigger_count: triggers.len(),
                    job_data: detail.data,
                });
            }
        }

        Ok(summaries)
    }

    /// Every trigger, by group then name.
    pub async fn list_triggers(&self) -> Result<Vec<TriggerSummary>> {
        let engine = self.engine()?;
        let mut summaries = Vec::new();

        let mut groups = engine.trigger_group_names().await?;
        groups.sort();

        for group in groups {
            let mut keys = engine.trigger_keys(&group).await?;
            keys.sort();

            for key in keys {
                let Some(trigger) = engine.trigger(&key).await? else {
                    continue;
                };
                let state = engine.trigger_state(&key).await?;

                let (repeat_interval_ms, repeat_count) = match &trigger.schedule {
                    Schedule::Simple {
                        interval,
                        repeat_count,
                    } => (
                        Some(interval.as_millis() as u64),
                        Some(repeat_count.map_or(-1, i64::from)),
                    ),
                    Schedule::Cron(_) => (None, None),
                };

                summaries.push(TriggerSummary {
                    trigger_key: key.to_string(),
                    group_name: key.group.clone(),
                    trigger_name: key.name.clone(),
                    job_key: trigger.job_key.to_string(),
                    job_name: trigger.job_key.name.clone(),
                    description: trigger.description.clone(),
                    start_time: trigger.start_time,
                    end_time: trigger.end_time,
                    next_fire_time: trigger.next_fire_time,
                    previous_fire_time: trigger.previous_fire_time,
                    trigger_state: state,
                    trigger_type: trigger.schedule.kind().trigger_type().to_string(),
                    cron_expression: trigger.schedule.cron_expression().map(str::to_string),
                    repeat_interval_ms,
                    repeat_count,
                    misfire_instruction: trigger.misfire_instruction,
                });
            }
        }

        Ok(summaries)
    }

    /// Up to `count` newest execution records.
    pub fn recent_history(&self, count: usize) -> Vec<ExecutionRecord> {
        self.history.get_recent(count)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Job & trigger actions
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn pause_job(&self, raw_key: &str) -> Result<JobKey> {
        let key = JobKey::parse(raw_key)?;
        self.engine()?.pause_job(&key).await?;
        info!(job_key = %key, "Job paused");
        Ok(key)
    }

    pub async fn resume_job(&self, raw_key: &str) -> Result<JobKey> {
        let key = JobKey::parse(raw_key)?;
        self.engine()?.resume_job(&key).await?;
        info!(job_key = %key, "Job resumed");
        Ok(key)
    }

    pub async fn trigger_job(&self, raw_key: &str) -> Result<JobKey> {
        let key = JobKey::parse(raw_key)?;
        self.engine()?.trigger_job(&key).await?;
        info!(job_key = %key, "Job triggered");
        Ok(key)
    }

    pub async fn delete_job(&self, raw_key: &str) -> Result<JobKey> {
        let key = JobKey::parse(raw_key)?;
        self.engine()?.delete_job(&key).await?;
        info!(job_key = %key, "Job deleted");
        Ok(key)
    }

    pub async fn pause_trigger(&self, raw_key: &str) -> Result<TriggerKey> {
        let key = TriggerKey::parse(raw_key)?;
        self.engine()?.pause_trigger(&key).await?;
        info!(trigger_key = %key, "Trigger paused");
        Ok(key)
    }

    pub async fn resume_trigger(&self, raw_key: &str) -> Result<TriggerKey> {
        let key = TriggerKey::parse(raw_key)?;
        self.engine()?.resume_trigger(&key).await?;
        info!(trigger_key = %key, "Trigger resumed");
        Ok(key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `job_type` in the default group on the fallback schedule.
    pub async fn register_job_with_defaults(&self, job_type: &str) -> Result<JobKey> {
        let engine = self.engine()?;
        Ok(register_job_with_defaults(engine.as_ref(), job_type).await?)
    }

    /// Register `job_type` shaped by its matching entry in `configs`.
    pub async fn register_job_from_config(
        &self,
        job_type: &str,
        configs: &[JobConfig],
    ) -> Result<JobKey> {
        let engine = self.engine()?;
        Ok(register_job_from_config(engine.as_ref(), job_type, configs).await?)
    }
}

fn startup_failed(error: RetryError<CadenceError>) -> CadenceError {
    match error {
        RetryError::Exhausted {
            attempts,
            last_error,
            ..
        } => CadenceError::new(
            ErrorCode::StartupFailed,
            format!(
                "Scheduler initialization failed after {attempts} attempts: {}",
                last_error.message()
            ),
        )
        .with_context("attempts", attempts)
        .with_source(last_error),
        RetryError::Cancelled { attempts, .. } => CadenceError::new(
            ErrorCode::StartupFailed,
            format!("Scheduler initialization cancelled after {attempts} attempts"),
        )
        .with_context("attempts", attempts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{
        EngineResult, EngineSettings, InMemoryEngine, Job, JobDetail, JobExecutionContext,
        JobRegistry, JobResult, Trigger,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct NoopJob;

    #[async_trait]
    impl Job for NoopJob {
        async fn execute(&self, _ctx: &JobExecutionContext) -> JobResult {
            Ok(())
        }
    }

    struct FixedFactory(Arc<dyn SchedulerEngine>);

    #[async_trait]
    impl EngineFactory for FixedFactory {
        async fn engine(&self) -> EngineResult<Arc<dyn SchedulerEngine>> {
            Ok(Arc::clone(&self.0))
        }
    }

    struct FailingFactory(AtomicU32);

    #[async_trait]
    impl EngineFactory for FailingFactory {
        async fn engine(&self) -> EngineResult<Arc<dyn SchedulerEngine>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Unavailable("job store offline".into()))
        }
    }

    struct CountingFactory {
        engine: Arc<dyn SchedulerEngine>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EngineFactory for CountingFactory {
        async fn engine(&self) -> EngineResult<Arc<dyn SchedulerEngine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Arc::clone(&self.engine))
        }
    }

    fn in_memory() -> Arc<dyn SchedulerEngine> {
        let registry = JobRegistry::builder().with_job::<NoopJob>().build();
        Arc::new(InMemoryEngine::new(EngineSettings::default(), Arc::new(registry)))
    }

    fn controller(engine: Arc<dyn SchedulerEngine>) -> SchedulerController {
        SchedulerController::new(
            Arc::new(FixedFactory(engine)),
            Arc::new(ExecutionHistoryRecorder::default()),
        )
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let controller = controller(in_memory());
        let err = controller.start_scheduler().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SchedulerNotInitialized);
        assert_eq!(controller.lifecycle_state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_start_registers_listener_once() {
        let engine = in_memory();
        let controller = controller(Arc::clone(&engine));
        let ctx = CancellationToken::new();

        controller.start(&ctx).await.unwrap();
        assert_eq!(controller.lifecycle_state(), LifecycleState::Running);
        assert!(engine.is_started().await);
        assert_eq!(engine.job_listener_names(), vec![HISTORY_LISTENER_NAME.to_string()]);

        controller.stop(&ctx).await.unwrap();
        assert_eq!(controller.lifecycle_state(), LifecycleState::Shutdown);
    }

    #[tokio::test]
    async fn test_lifecycle_idempotence() {
        let controller = controller(in_memory());
        controller.start(&CancellationToken::new()).await.unwrap();

        assert!(!controller.start_scheduler().await.unwrap());

        assert!(controller.standby().await.unwrap());
        assert!(!controller.standby().await.unwrap());
        assert_eq!(controller.lifecycle_state(), LifecycleState::Standby);

        assert!(controller.start_scheduler().await.unwrap());
        assert_eq!(controller.lifecycle_state(), LifecycleState::Running);

        assert!(controller.shutdown(true).await.unwrap());
        assert!(!controller.shutdown(true).await.unwrap());
        assert!(!controller.standby().await.unwrap());

        let err = controller.start_scheduler().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SchedulerShutDown);
    }

    #[tokio::test]
    async fn test_concurrent_starts_initialize_once() {
        let factory = Arc::new(CountingFactory {
            engine: in_memory(),
            calls: AtomicU32::new(0),
        });
        let controller = SchedulerController::new(
            Arc::clone(&factory) as Arc<dyn EngineFactory>,
            Arc::new(ExecutionHistoryRecorder::default()),
        );
        let ctx = CancellationToken::new();

        let (first, second) = tokio::join!(controller.start(&ctx), controller.start(&ctx));
        first.unwrap();
        second.unwrap();

        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.lifecycle_state(), LifecycleState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_failure_after_retries() {
        let factory = Arc::new(FailingFactory(AtomicU32::new(0)));
        let controller = SchedulerController::new(
            Arc::clone(&factory) as Arc<dyn EngineFactory>,
            Arc::new(ExecutionHistoryRecorder::default()),
        );

        let started = tokio::time::Instant::now();
        let err = controller.start(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::StartupFailed);
        assert_eq!(factory.0.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(controller.lifecycle_state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_list_jobs_aggregates_triggers() {
        let engine = in_memory();
        let key = JobKey::new("report", "ops");
        let early = Trigger::new(
            TriggerKey::new("early", "ops"),
            key.clone(),
            Schedule::cron("0 0 1 * * ?").unwrap(),
        );
        let late = Trigger::new(
            TriggerKey::new("late", "ops"),
            key.clone(),
            Schedule::cron("0 0 23 * * ?").unwrap(),
        );
        engine
            .schedule_job(JobDetail::new(key.clone(), "NoopJob"), vec![early, late], false)
            .await
            .unwrap();
        engine
            .schedule_job(JobDetail::new(JobKey::with_default_group("bare"), "NoopJob"), vec![], false)
            .await
            .unwrap();

        let controller = controller(Arc::clone(&engine));
        controller.start(&CancellationToken::new()).await.unwrap();

        let jobs = controller.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_key, "DEFAULT.bare");
        assert_eq!(jobs[0].trigger_count, 0);
        assert!(jobs[0].next_fire_time.is_none());

        let report = &jobs[1];
        assert_eq!(report.trigger_count, 2);
        let triggers = engine.triggers_of_job(&key).await.unwrap();
        let latest = triggers.iter().filter_map(|t| t.next_fire_time).max();
        assert_eq!(report.next_fire_time, latest);

        let triggers = controller.list_triggers().await.unwrap();
        assert_eq!(triggers[0].trigger_key, "ops.early");
        assert_eq!(triggers[0].trigger_type, "CronTrigger");
        assert_eq!(triggers[0].cron_expression.as_deref(), Some("0 0 1 * * ?"));
        assert_eq!(triggers[1].trigger_state, TriggerState::Normal);

        controller.shutdown(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_actions_default_group_and_errors() {
        let engine = in_memory();
        let controller = controller(Arc::clone(&engine));
        controller.start(&CancellationToken::new()).await.unwrap();
        controller.register_job_with_defaults("NoopJob").await.unwrap();

        let key = controller.pause_job("NoopJob").await.unwrap();
        assert_eq!(key.to_string(), "DEFAULT.NoopJob");
        let state = engine
            .trigger_state(&TriggerKey::with_default_group("NoopJob-trigger"))
            .await
            .unwrap();
        assert_eq!(state, TriggerState::Paused);

        let err = controller.pause_job(".broken").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidJobKey);

        let err = controller.resume_job("DEFAULT.Missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::JobNotFound);

        let err = controller.pause_trigger("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TriggerNotFound);

        controller.delete_job("NoopJob").await.unwrap();
        assert!(controller.list_jobs().await.unwrap().is_empty());

        controller.shutdown(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let controller = controller(in_memory());
        controller.start(&CancellationToken::new()).await.unwrap();

        let status = controller.status().await.unwrap();
        assert_eq!(status.scheduler_name, "CadenceScheduler");
        assert_eq!(status.job_store_type, "RAMJobStore");
        assert!(status.is_started);
        assert!(!status.is_standby_mode);
        assert_eq!(status.state, LifecycleState::Running);
        assert!(status.running_since.is_some());

        controller.shutdown(false).await.unwrap();
    }
}
