//! In-process scheduling engine.
//!
//! Jobs and triggers live in a RAM job store. A single firing loop task wakes
//! at the earliest fire time (or when poked through a [`Notify`]), claims due
//! triggers under the store lock and hands each fire to a worker task. Worker
//! concurrency is bounded by a [`Semaphore`] sized by the thread pool setting;
//! in-flight executions are tracked so shutdown can wait for them.
//!
//! Nothing is persisted: a restart loses every job, trigger and pause state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, OnceCell, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::engine::{EngineError, EngineFactory, EngineResult, SchedulerEngine};
use super::job::{JobExecutionContext, JobExecutionError, JobFactory};
use super::key::{JobKey, TriggerKey};
use super::listener::JobListener;
use super::model::{EngineMetadata, JobDetail, Schedule, Trigger, TriggerState};
use super::registry::{register_all, JobRegistry};
use crate::config::{JobConfig, SchedulerConfig};

/// Group holding the one-shot triggers created by [`SchedulerEngine::trigger_job`].
pub const MANUAL_TRIGGER_GROUP: &str = "MANUAL_TRIGGER";

const JOB_STORE_TYPE: &str = "RAMJobStore";
const THREAD_POOL_TYPE: &str = "TokioWorkerPool";

/// Upper bound on how long the firing loop sleeps without re-checking the store.
const IDLE_WAIT: Duration = Duration::from_secs(30);

// ═══════════════════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub scheduler_name: String,
    pub instance_id: String,
    pub thread_pool_size: usize,
    /// How late a fire may be before its misfire instruction applies
    pub misfire_threshold: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scheduler_name: "CadenceScheduler".to_string(),
            instance_id: "NON_CLUSTERED".to_string(),
            thread_pool_size: 10,
            misfire_threshold: Duration::from_secs(60),
        }
    }
}

impl From<&SchedulerConfig> for EngineSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            scheduler_name: config.name.clone(),
            instance_id: config.instance_id.clone(),
            thread_pool_size: config.thread_pool_size.max(1),
            misfire_threshold: config.misfire_threshold,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Store
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct StoredTrigger {
    trigger: Trigger,
    state: TriggerState,
}

/// A claimed fire, ready for a worker.
#[derive(Debug, Clone)]
struct Fire {
    job: JobDetail,
    trigger_key: TriggerKey,
    scheduled_fire_time: DateTime<Utc>,
    previous_fire_time: Option<DateTime<Utc>>,
    next_fire_time: Option<DateTime<Utc>>,
    vetoed: bool,
}

#[derive(Debug, Default)]
struct JobStore {
    jobs: BTreeMap<JobKey, JobDetail>,
    triggers: BTreeMap<TriggerKey, StoredTrigger>,
    /// In-flight executions per job
    running: HashMap<JobKey, usize>,
}

impl JobStore {
    fn is_running(&self, key: &JobKey) -> bool {
        self.running.get(key).is_some_and(|n| *n > 0)
    }

    fn job_triggers<'a>(&'a self, key: &'a JobKey) -> impl Iterator<Item = &'a StoredTrigger> + 'a {
        self.triggers.values().filter(move |t| &t.trigger.job_key == key)
    }

    fn state_of(&self, stored: &StoredTrigger) -> TriggerState {
        if stored.state != TriggerState::Normal {
            return stored.state;
        }
        let blocked = self
            .jobs
            .get(&stored.trigger.job_key)
            .is_some_and(|job| job.disallow_concurrent_execution && self.is_running(&job.key));
        if blocked {
            TriggerState::Blocked
        } else {
            TriggerState::Normal
        }
    }

    fn store(&mut self, job: JobDetail, triggers: Vec<Trigger>, replace: bool) -> EngineResult<()> {
        if !replace && self.jobs.contains_key(&job.key) {
            return Err(EngineError::JobAlreadyExists(job.key));
        }

        let mut prepared = Vec::with_capacity(triggers.len());
        for mut trigger in triggers {
            if trigger.job_key != job.key {
                return Err(EngineError::MissingJobForTrigger {
                    trigger: trigger.key,
                    job: trigger.job_key,
                });
            }
            if !replace && self.triggers.contains_key(&trigger.key) {
                return Err(EngineError::TriggerAlreadyExists(trigger.key));
            }
            if trigger.compute_first_fire_time().is_none() {
                return Err(EngineError::TriggerWillNeverFire(trigger.key));
            }
            prepared.push(trigger);
        }

        self.jobs.insert(job.key.clone(), job);
        for trigger in prepared {
            self.triggers.insert(
                trigger.key.clone(),
                StoredTrigger {
                    trigger,
                    state: TriggerState::Normal,
                },
            );
        }
        Ok(())
    }

    fn remove_job(&mut self, key: &JobKey) -> EngineResult<()> {
        if self.jobs.remove(key).is_none() {
            return Err(EngineError::JobNotFound(key.clone()));
        }
        self.triggers.retain(|_, t| &t.trigger.job_key != key);
        Ok(())
    }

    fn set_job_paused(&mut self, key: &JobKey, paused: bool) -> EngineResult<()> {
        if !self.jobs.contains_key(key) {
            return Err(EngineError::JobNotFound(key.clone()));
        }
        for stored in self.triggers.values_mut().filter(|t| &t.trigger.job_key == key) {
            Self::toggle_pause(stored, paused);
        }
        Ok(())
    }

    fn set_trigger_paused(&mut self, key: &TriggerKey, paused: bool) -> EngineResult<()> {
        let stored = self
            .triggers
            .get_mut(key)
            .ok_or_else(|| EngineError::TriggerNotFound(key.clone()))?;
        Self::toggle_pause(stored, paused);
        Ok(())
    }

    fn toggle_pause(stored: &mut StoredTrigger, paused: bool) {
        stored.state = match (stored.state, paused) {
            (TriggerState::Normal, true) => TriggerState::Paused,
            (TriggerState::Paused, false) => TriggerState::Normal,
            (state, _) => state,
        };
    }

    /// Claim every fire due at `now` and advance the claimed triggers.
    ///
    /// Returns the fires plus the earliest remaining fire time.
    fn acquire_due(
        &mut self,
        now: DateTime<Utc>,
        misfire_threshold: Duration,
    ) -> (Vec<Fire>, Option<DateTime<Utc>>) {
        let threshold = chrono::Duration::from_std(misfire_threshold)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        let mut fires = Vec::new();
        let mut finished_manual = Vec::new();

        for (key, stored) in self.triggers.iter_mut() {
            if stored.state != TriggerState::Normal {
                continue;
            }
            let Some(scheduled) = stored.trigger.next_fire_time else {
                stored.state = TriggerState::Complete;
                continue;
            };
            if scheduled > now {
                continue;
            }

            let Some(job) = self.jobs.get(&stored.trigger.job_key) else {
                warn!(trigger_key = %key, job_key = %stored.trigger.job_key, "Trigger references a missing job");
                stored.state = TriggerState::Error;
                continue;
            };

            let misfired = now - scheduled > threshold;
            if misfired && !stored.trigger.fires_on_misfire() {
                debug!(trigger_key = %key, scheduled = %scheduled, "Misfire, skipping to next fire time");
                stored.trigger.skip_missed(now);
                if stored.trigger.next_fire_time.is_none() {
                    stored.state = TriggerState::Complete;
                }
                continue;
            }

            let vetoed = job.disallow_concurrent_execution
                && self.running.get(&job.key).is_some_and(|n| *n > 0);

            let previous_fire_time = stored.trigger.previous_fire_time;
            stored.trigger.triggered(if misfired { now } else { scheduled });
            if stored.trigger.next_fire_time.is_none() {
                stored.state = TriggerState::Complete;
                if key.group == MANUAL_TRIGGER_GROUP {
                    finished_manual.push(key.clone());
                }
            }

            if !vetoed {
                *self.running.entry(job.key.clone()).or_default() += 1;
            }

            fires.push(Fire {
                job: job.clone(),
                trigger_key: key.clone(),
                scheduled_fire_time: scheduled,
                previous_fire_time,
                next_fire_time: stored.trigger.next_fire_time,
                vetoed,
            });
        }

        for key in finished_manual {
            self.triggers.remove(&key);
        }

        let next_wake = self
            .triggers
            .values()
            .filter(|t| t.state == TriggerState::Normal)
            .filter_map(|t| t.trigger.next_fire_time)
            .min();

        (fires, next_wake)
    }

    fn complete(&mut self, key: &JobKey) {
        if let Some(count) = self.running.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.running.remove(key);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════════

struct EngineInner {
    settings: EngineSettings,
    job_factory: Arc<dyn JobFactory>,
    store: Mutex<JobStore>,
    listeners: RwLock<Vec<Arc<dyn JobListener>>>,
    started: AtomicBool,
    standby: AtomicBool,
    shutdown: AtomicBool,
    running_since: Mutex<Option<DateTime<Utc>>>,
    jobs_executed: AtomicU64,
    wake: Notify,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// RAM-only [`SchedulerEngine`]. Created in standby; call `start` to fire.
pub struct InMemoryEngine {
    inner: Arc<EngineInner>,
    firing_loop: Mutex<Option<JoinHandle<()>>>,
}

impl InMemoryEngine {
    pub fn new(settings: EngineSettings, job_factory: Arc<dyn JobFactory>) -> Self {
        let workers = Arc::new(Semaphore::new(settings.thread_pool_size.max(1)));

        info!(
            scheduler = %settings.scheduler_name,
            instance_id = %settings.instance_id,
            thread_pool_size = settings.thread_pool_size,
            "In-memory engine created"
        );

        Self {
            inner: Arc::new(EngineInner {
                settings,
                job_factory,
                store: Mutex::new(JobStore::default()),
                listeners: RwLock::new(Vec::new()),
                started: AtomicBool::new(false),
                standby: AtomicBool::new(true),
                shutdown: AtomicBool::new(false),
                running_since: Mutex::new(None),
                jobs_executed: AtomicU64::new(0),
                wake: Notify::new(),
                workers,
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
            }),
            firing_loop: Mutex::new(None),
        }
    }

    fn ensure_running(&self) -> EngineResult<()> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(EngineError::Shutdown);
        }
        Ok(())
    }

    /// Mutate the store, then wake the firing loop.
    fn with_store<T>(&self, f: impl FnOnce(&mut JobStore) -> EngineResult<T>) -> EngineResult<T> {
        self.ensure_running()?;
        let result = f(&mut self.inner.store.lock());
        self.inner.wake.notify_one();
        result
    }

    /// Read the store.
    fn read_store<T>(&self, f: impl FnOnce(&JobStore) -> T) -> EngineResult<T> {
        self.ensure_running()?;
        Ok(f(&self.inner.store.lock()))
    }
}

impl EngineInner {
    async fn run_firing_loop(self: Arc<Self>) {
        info!(scheduler = %self.settings.scheduler_name, "Firing loop started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if self.standby.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = self.wake.notified() => continue,
                }
            }

            let (fires, next_wake) = self
                .store
                .lock()
                .acquire_due(Utc::now(), self.settings.misfire_threshold);

            for fire in fires {
                self.dispatch(fire);
            }

            let sleep_for = next_wake
                .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
                .unwrap_or(IDLE_WAIT)
                .min(IDLE_WAIT);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }

        info!(scheduler = %self.settings.scheduler_name, "Firing loop stopped");
    }

    fn dispatch(self: &Arc<Self>, fire: Fire) {
        let inner = Arc::clone(self);
        self.tracker.spawn(async move {
            if fire.vetoed {
                inner.veto(fire).await;
                return;
            }
            let Ok(_permit) = Arc::clone(&inner.workers).acquire_owned().await else {
                inner.store.lock().complete(&fire.job.key);
                return;
            };
            inner.execute(fire).await;
        });
    }

    fn context_for(fire: &Fire) -> JobExecutionContext {
        let mut ctx = JobExecutionContext::new(
            fire.job.key.clone(),
            fire.job.job_type.clone(),
            fire.trigger_key.clone(),
        );
        ctx.scheduled_fire_time = Some(fire.scheduled_fire_time);
        ctx.previous_fire_time = fire.previous_fire_time;
        ctx.next_fire_time = fire.next_fire_time;
        ctx.data = fire.job.data.clone();
        ctx
    }

    fn listeners(&self) -> Vec<Arc<dyn JobListener>> {
        self.listeners.read().clone()
    }

    async fn veto(&self, fire: Fire) {
        let ctx = Self::context_for(&fire);
        counter!("cadence_job_vetoes_total", "job" => ctx.job_key.to_string()).increment(1);
        debug!(job_key = %ctx.job_key, trigger_key = %ctx.trigger_key, "Execution vetoed, job still running");
        for listener in self.listeners() {
            listener.job_execution_vetoed(&ctx).await;
        }
    }

    async fn execute(&self, fire: Fire) {
        let mut ctx = Self::context_for(&fire);
        let listeners = self.listeners();

        for listener in &listeners {
            listener.job_to_be_executed(&ctx).await;
        }

        let started = Instant::now();
        let result = match self.job_factory.new_job(&fire.job.job_type) {
            Some(job) => AssertUnwindSafe(job.execute(&ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(JobExecutionError::new("Job panicked during execution").with_code("PANIC"))
                }),
            None => Err(JobExecutionError::new(
                EngineError::UnknownJobType(fire.job.job_type.clone()).to_string(),
            )
            .with_code("UNKNOWN_JOB_TYPE")),
        };
        ctx.job_run_time = Some(started.elapsed());
        self.jobs_executed.fetch_add(1, Ordering::Relaxed);

        match &result {
            Ok(()) => debug!(job_key = %ctx.job_key, "Job completed"),
            Err(e) => error!(job_key = %ctx.job_key, error = %e, "Job failed"),
        }

        for listener in &listeners {
            listener.job_was_executed(&ctx, result.as_ref().err()).await;
        }

        self.store.lock().complete(&fire.job.key);
        self.wake.notify_one();
    }
}

#[async_trait]
impl SchedulerEngine for InMemoryEngine {
    fn scheduler_name(&self) -> &str {
        &self.inner.settings.scheduler_name
    }

    fn instance_id(&self) -> &str {
        &self.inner.settings.instance_id
    }

    async fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst) && !self.inner.shutdown.load(Ordering::SeqCst)
    }

    async fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    async fn in_standby_mode(&self) -> bool {
        self.inner.standby.load(Ordering::SeqCst)
    }

    async fn metadata(&self) -> EngineResult<EngineMetadata> {
        Ok(EngineMetadata {
            scheduler_name: self.inner.settings.scheduler_name.clone(),
            instance_id: self.inner.settings.instance_id.clone(),
            started: self.is_started().await,
            shutdown: self.is_shutdown().await,
            standby: self.in_standby_mode().await,
            job_store_type: JOB_STORE_TYPE.to_string(),
            thread_pool_type: THREAD_POOL_TYPE.to_string(),
            thread_pool_size: self.inner.settings.thread_pool_size,
            version: env!("CARGO_PKG_VERSION").to_string(),
            running_since: *self.inner.running_since.lock(),
            jobs_executed: self.inner.jobs_executed.load(Ordering::Relaxed),
        })
    }

    async fn start(&self) -> EngineResult<()> {
        self.ensure_running()?;

        {
            let mut firing_loop = self.firing_loop.lock();
            if firing_loop.is_none() {
                let inner = Arc::clone(&self.inner);
                *firing_loop = Some(tokio::spawn(inner.run_firing_loop()));
            }
        }

        self.inner.started.store(true, Ordering::SeqCst);
        self.inner.standby.store(false, Ordering::SeqCst);
        self.inner.running_since.lock().get_or_insert_with(Utc::now);
        self.inner.wake.notify_one();

        info!(scheduler = %self.scheduler_name(), "Engine started");
        Ok(())
    }

    async fn standby(&self) -> EngineResult<()> {
        self.ensure_running()?;
        self.inner.standby.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
        info!(scheduler = %self.scheduler_name(), "Engine in standby");
        Ok(())
    }

    async fn shutdown(&self, wait_for_jobs: bool) -> EngineResult<()> {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!(scheduler = %self.scheduler_name(), wait_for_jobs, "Engine shutting down");
        self.inner.standby.store(true, Ordering::SeqCst);
        self.inner.cancel.cancel();
        self.inner.tracker.close();

        let firing_loop = self.firing_loop.lock().take();
        if let Some(handle) = firing_loop {
            if let Err(e) = handle.await {
                warn!(error = %e, "Firing loop ended abnormally");
            }
        }

        if wait_for_jobs {
            self.inner.tracker.wait().await;
        }

        info!(scheduler = %self.scheduler_name(), "Engine shut down");
        Ok(())
    }

    async fn job_group_names(&self) -> EngineResult<Vec<String>> {
        self.read_store(|store| {
            store
                .jobs
                .keys()
                .map(|k| k.group.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    async fn job_keys(&self, group: &str) -> EngineResult<Vec<JobKey>> {
        self.read_store(|store| store.jobs.keys().filter(|k| k.group == group).cloned().collect())
    }

    async fn job_detail(&self, key: &JobKey) -> EngineResult<Option<JobDetail>> {
        self.read_store(|store| store.jobs.get(key).cloned())
    }

    async fn triggers_of_job(&self, key: &JobKey) -> EngineResult<Vec<Trigger>> {
        self.read_store(|store| store.job_triggers(key).map(|t| t.trigger.clone()).collect())
    }

    async fn trigger_group_names(&self) -> EngineResult<Vec<String>> {
        self.read_store(|store| {
            store
                .triggers
                .keys()
                .map(|k| k.group.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    async fn trigger_keys(&self, group: &str) -> EngineResult<Vec<TriggerKey>> {
        self.read_store(|store| {
            store
                .triggers
                .keys()
                .filter(|k| k.group == group)
                .cloned()
                .collect()
        })
    }

    async fn trigger(&self, key: &TriggerKey) -> EngineResult<Option<Trigger>> {
        self.read_store(|store| store.triggers.get(key).map(|t| t.trigger.clone()))
    }

    async fn trigger_state(&self, key: &TriggerKey) -> EngineResult<TriggerState> {
        self.read_store(|store| {
            store
                .triggers
                .get(key)
                .map_or(TriggerState::None, |t| store.state_of(t))
        })
    }

    async fn schedule_job(
        &self,
        job: JobDetail,
        triggers: Vec<Trigger>,
        replace: bool,
    ) -> EngineResult<()> {
        let job_key = job.key.clone();
        let trigger_count = triggers.len();
        self.with_store(|store| store.store(job, triggers, replace))?;
        debug!(job_key = %job_key, triggers = trigger_count, "Job scheduled");
        Ok(())
    }

    async fn pause_job(&self, key: &JobKey) -> EngineResult<()> {
        self.with_store(|store| store.set_job_paused(key, true))
    }

    async fn resume_job(&self, key: &JobKey) -> EngineResult<()> {
        self.with_store(|store| store.set_job_paused(key, false))
    }

    async fn trigger_job(&self, key: &JobKey) -> EngineResult<()> {
        self.with_store(|store| {
            let job = store
                .jobs
                .get(key)
                .cloned()
                .ok_or_else(|| EngineError::JobNotFound(key.clone()))?;
            let trigger = Trigger::new(
                TriggerKey::new(Uuid::new_v4().to_string(), MANUAL_TRIGGER_GROUP),
                key.clone(),
                Schedule::once(),
            );
            store.store(job, vec![trigger], true)
        })
    }

    async fn delete_job(&self, key: &JobKey) -> EngineResult<()> {
        self.with_store(|store| store.remove_job(key))
    }

    async fn pause_trigger(&self, key: &TriggerKey) -> EngineResult<()> {
        self.with_store(|store| store.set_trigger_paused(key, true))
    }

    async fn resume_trigger(&self, key: &TriggerKey) -> EngineResult<()> {
        self.with_store(|store| store.set_trigger_paused(key, false))
    }

    fn job_listener_names(&self) -> Vec<String> {
        self.inner
            .listeners
            .read()
            .iter()
            .map(|l| l.name().to_string())
            .collect()
    }

    fn add_job_listener(&self, listener: Arc<dyn JobListener>) {
        let mut listeners = self.inner.listeners.write();
        listeners.retain(|l| l.name() != listener.name());
        listeners.push(listener);
    }

    fn remove_job_listener(&self, name: &str) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.name() != name);
        listeners.len() != before
    }
}

impl Drop for InMemoryEngine {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Factory
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds one [`InMemoryEngine`], registers the configured jobs on it and hands
/// out the same handle on every call.
pub struct InMemoryEngineFactory {
    settings: EngineSettings,
    registry: Arc<JobRegistry>,
    jobs: Vec<JobConfig>,
    engine: OnceCell<Arc<dyn SchedulerEngine>>,
}

impl InMemoryEngineFactory {
    pub fn new(settings: EngineSettings, registry: JobRegistry, jobs: Vec<JobConfig>) -> Self {
        Self {
            settings,
            registry: Arc::new(registry),
            jobs,
            engine: OnceCell::new(),
        }
    }
}

#[async_trait]
impl EngineFactory for InMemoryEngineFactory {
    async fn engine(&self) -> EngineResult<Arc<dyn SchedulerEngine>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let engine: Arc<dyn SchedulerEngine> = Arc::new(InMemoryEngine::new(
                    self.settings.clone(),
                    Arc::clone(&self.registry) as Arc<dyn JobFactory>,
                ));
                register_all(engine.as_ref(), &self.registry, &self.jobs).await?;
                Ok::<_, EngineError>(engine)
            })
            .await?;
        Ok(Arc::clone(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::model::MisfireInstruction;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    fn job(name: &str) -> JobDetail {
        JobDetail::new(JobKey::with_default_group(name), "TestJob")
    }

    fn cron_trigger(name: &str, job: &str, start: DateTime<Utc>) -> Trigger {
        Trigger::new(
            TriggerKey::with_default_group(name),
            JobKey::with_default_group(job),
            Schedule::cron("0 * * * * *").unwrap(),
        )
        .starting_at(start)
    }

    const THRESHOLD: Duration = Duration::from_secs(60);

    #[test]
    fn test_store_rejects_duplicates_without_replace() {
        let mut store = JobStore::default();
        store.store(job("a"), vec![], false).unwrap();
        assert!(matches!(
            store.store(job("a"), vec![], false),
            Err(EngineError::JobAlreadyExists(_))
        ));
        assert!(store.store(job("a"), vec![], true).is_ok());
    }

    #[test]
    fn test_store_rejects_foreign_trigger() {
        let mut store = JobStore::default();
        let result = store.store(job("a"), vec![cron_trigger("t", "b", at(9, 0, 0))], false);
        assert!(matches!(result, Err(EngineError::MissingJobForTrigger { .. })));
        assert!(store.jobs.is_empty());
    }

    #[test]
    fn test_acquire_due_fires_and_advances() {
        let mut store = JobStore::default();
        store
            .store(job("a"), vec![cron_trigger("t", "a", at(9, 0, 0))], false)
            .unwrap();

        let (fires, next) = store.acquire_due(at(8, 59, 59), THRESHOLD);
        assert!(fires.is_empty());
        assert_eq!(next, Some(at(9, 0, 0)));

        let (fires, next) = store.acquire_due(at(9, 0, 0), THRESHOLD);
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].scheduled_fire_time, at(9, 0, 0));
        assert_eq!(fires[0].next_fire_time, Some(at(9, 1, 0)));
        assert_eq!(next, Some(at(9, 1, 0)));
        assert!(store.is_running(&JobKey::with_default_group("a")));
    }

    #[test]
    fn test_cron_misfire_skips_to_next() {
        let mut store = JobStore::default();
        store
            .store(job("a"), vec![cron_trigger("t", "a", at(9, 0, 0))], false)
            .unwrap();

        let (fires, next) = store.acquire_due(at(9, 5, 30), THRESHOLD);
        assert!(fires.is_empty());
        assert_eq!(next, Some(at(9, 6, 0)));
    }

    #[test]
    fn test_fire_now_misfire_fires_late() {
        let mut store = JobStore::default();
        let trigger = cron_trigger("t", "a", at(9, 0, 0))
            .with_misfire_instruction(MisfireInstruction::FireNow);
        store.store(job("a"), vec![trigger], false).unwrap();

        let (fires, _) = store.acquire_due(at(9, 5, 30), THRESHOLD);
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].next_fire_time, Some(at(9, 6, 0)));
    }

    #[test]
    fn test_paused_triggers_do_not_fire() {
        let mut store = JobStore::default();
        store
            .store(job("a"), vec![cron_trigger("t", "a", at(9, 0, 0))], false)
            .unwrap();
        store.set_job_paused(&JobKey::with_default_group("a"), true).unwrap();

        let (fires, next) = store.acquire_due(at(9, 0, 0), THRESHOLD);
        assert!(fires.is_empty());
        assert_eq!(next, None);

        store
            .set_trigger_paused(&TriggerKey::with_default_group("t"), false)
            .unwrap();
        let (fires, _) = store.acquire_due(at(9, 0, 10), THRESHOLD);
        assert_eq!(fires.len(), 1);
    }

    #[test]
    fn test_disallow_concurrent_blocks_and_vetoes() {
        let mut store = JobStore::default();
        let detail = job("a").disallow_concurrent_execution(true);
        let trigger = Trigger::new(
            TriggerKey::with_default_group("t"),
            JobKey::with_default_group("a"),
            Schedule::simple(Duration::from_secs(1), None).unwrap(),
        )
        .starting_at(at(9, 0, 0));
        store.store(detail, vec![trigger], false).unwrap();

        let (fires, _) = store.acquire_due(at(9, 0, 0), THRESHOLD);
        assert!(!fires[0].vetoed);

        let stored = store.triggers.get(&TriggerKey::with_default_group("t")).unwrap();
        assert_eq!(store.state_of(stored), TriggerState::Blocked);

        let (fires, _) = store.acquire_due(at(9, 0, 1), THRESHOLD);
        assert!(fires[0].vetoed);

        store.complete(&JobKey::with_default_group("a"));
        let stored = store.triggers.get(&TriggerKey::with_default_group("t")).unwrap();
        assert_eq!(store.state_of(stored), TriggerState::Normal);
    }

    #[test]
    fn test_manual_trigger_removed_after_fire() {
        let mut store = JobStore::default();
        store.store(job("a"), vec![], false).unwrap();
        let manual = Trigger::new(
            TriggerKey::new("once", MANUAL_TRIGGER_GROUP),
            JobKey::with_default_group("a"),
            Schedule::once(),
        )
        .starting_at(at(9, 0, 0));
        store.store(job("a"), vec![manual], true).unwrap();

        let (fires, _) = store.acquire_due(at(9, 0, 0), THRESHOLD);
        assert_eq!(fires.len(), 1);
        assert!(store.triggers.is_empty());
        assert!(store.jobs.contains_key(&JobKey::with_default_group("a")));
    }

    #[test]
    fn test_remove_job_drops_triggers() {
        let mut store = JobStore::default();
        store
            .store(job("a"), vec![cron_trigger("t", "a", at(9, 0, 0))], false)
            .unwrap();
        store.remove_job(&JobKey::with_default_group("a")).unwrap();
        assert!(store.triggers.is_empty());
        assert!(matches!(
            store.remove_job(&JobKey::with_default_group("a")),
            Err(EngineError::JobNotFound(_))
        ));
    }
}
