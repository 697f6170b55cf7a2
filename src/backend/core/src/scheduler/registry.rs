//! Compile-time job registry and config-driven job registration.
//!
//! Job types are registered explicitly on a [`JobRegistry`] builder; the
//! registry then serves as the engine's [`JobFactory`]. [`register_all`]
//! schedules every registered type on an engine, shaping each one from its
//! matching configuration entry or from defaults when there is none.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

use super::engine::{EngineError, EngineResult, SchedulerEngine};
use super::job::{Job, JobFactory};
use super::key::{JobKey, TriggerKey, DEFAULT_GROUP};
use super::model::{JobDetail, Schedule, Trigger};
use crate::config::JobConfig;

/// Cron used by any trigger that does not name one: every 30 seconds.
pub const FALLBACK_CRON: &str = "0/30 * * * * ?";

type JobConstructor = Arc<dyn Fn() -> Arc<dyn Job> + Send + Sync>;

/// Last path segment of a Rust type name.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub struct JobRegistry {
    constructors: BTreeMap<String, JobConstructor>,
}

impl JobRegistry {
    pub fn builder() -> JobRegistryBuilder {
        JobRegistryBuilder::default()
    }

    /// Registered type names, sorted.
    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.constructors.contains_key(job_type)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl JobFactory for JobRegistry {
    fn new_job(&self, job_type: &str) -> Option<Arc<dyn Job>> {
        self.constructors.get(job_type).map(|construct| construct())
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct JobRegistryBuilder {
    constructors: BTreeMap<String, JobConstructor>,
}

impl JobRegistryBuilder {
    /// Register `J` under its type name (`HeartbeatJob` for `crate::x::HeartbeatJob`).
    pub fn with_job<J>(self) -> Self
    where
        J: Job + Default + 'static,
    {
        self.with_job_factory(short_type_name::<J>(), J::default)
    }

    /// Register a job type built by `factory` on every fire.
    pub fn with_job_factory<J, F>(mut self, job_type: impl Into<String>, factory: F) -> Self
    where
        J: Job + 'static,
        F: Fn() -> J + Send + Sync + 'static,
    {
        let construct: JobConstructor = Arc::new(move || Arc::new(factory()) as Arc<dyn Job>);
        self.constructors.insert(job_type.into(), construct);
        self
    }

    pub fn build(self) -> JobRegistry {
        JobRegistry {
            constructors: self.constructors,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a configuration entry targets `job_type`.
///
/// Entries may name the bare type or a path ending in `::{job_type}`.
pub fn config_matches(config: &JobConfig, job_type: &str) -> bool {
    let configured = config.job_type.trim();
    configured == job_type
        || configured
            .strip_suffix(job_type)
            .is_some_and(|prefix| prefix.ends_with("::"))
}

fn fallback_trigger(job_key: &JobKey) -> EngineResult<Trigger> {
    Ok(Trigger::new(
        TriggerKey::new(format!("{}-trigger", job_key.name), job_key.group.clone()),
        job_key.clone(),
        Schedule::cron(FALLBACK_CRON)?,
    ))
}

/// Build the job and its triggers from `config`, or from defaults when `None`.
pub fn build_job(job_type: &str, config: Option<&JobConfig>) -> EngineResult<(JobDetail, Vec<Trigger>)> {
    let Some(config) = config else {
        let key = JobKey::new(job_type, DEFAULT_GROUP);
        let trigger = fallback_trigger(&key)?;
        return Ok((JobDetail::new(key, job_type), vec![trigger]));
    };

    let name = config.name.clone().unwrap_or_else(|| job_type.to_string());
    let group = config.group.clone().unwrap_or_else(|| DEFAULT_GROUP.to_string());
    let key = JobKey::new(name, group);

    let job = JobDetail::new(key.clone(), job_type)
        .with_description(config.description.clone())
        .with_data(config.data.clone())
        .disallow_concurrent_execution(config.disallow_concurrent_execution);

    if config.triggers.is_empty() {
        return Ok((job, vec![fallback_trigger(&key)?]));
    }

    let mut seen = BTreeSet::new();
    let mut triggers = Vec::with_capacity(config.triggers.len());
    for (index, entry) in config.triggers.iter().enumerate() {
        // Unnamed entries after the first are numbered by position.
        let name = entry.name.clone().unwrap_or_else(|| match index {
            0 => format!("{}-trigger", key.name),
            n => format!("{}-trigger-{}", key.name, n + 1),
        });
        let trigger_key =
            TriggerKey::new(name, entry.group.clone().unwrap_or_else(|| key.group.clone()));
        if !seen.insert(trigger_key.clone()) {
            return Err(EngineError::TriggerAlreadyExists(trigger_key));
        }

        let cron = entry.cron_expression.as_deref().unwrap_or(FALLBACK_CRON);
        triggers.push(
            Trigger::new(trigger_key, key.clone(), Schedule::cron(cron)?)
                .with_description(entry.description.clone()),
        );
    }

    Ok((job, triggers))
}

/// Register `job_type` using the first matching configuration entry.
pub async fn register_job_from_config(
    engine: &dyn SchedulerEngine,
    job_type: &str,
    configs: &[JobConfig],
) -> EngineResult<JobKey> {
    let config = configs.iter().find(|c| config_matches(c, job_type));
    let (job, triggers) = build_job(job_type, config)?;
    let key = job.key.clone();

    info!(
        job_key = %key,
        job_type,
        configured = config.is_some(),
        triggers = triggers.len(),
        "Registering job"
    );

    engine.schedule_job(job, triggers, true).await?;
    Ok(key)
}

/// Register `job_type` in the default group with the fallback schedule.
pub async fn register_job_with_defaults(
    engine: &dyn SchedulerEngine,
    job_type: &str,
) -> EngineResult<JobKey> {
    register_job_from_config(engine, job_type, &[]).await
}

/// Register every type known to `registry`.
pub async fn register_all(
    engine: &dyn SchedulerEngine,
    registry: &JobRegistry,
    configs: &[JobConfig],
) -> EngineResult<Vec<JobKey>> {
    let mut keys = Vec::with_capacity(registry.len());
    for job_type in registry.job_types() {
        keys.push(register_job_from_config(engine, job_type, configs).await?);
    }
    Ok(keys)
}
