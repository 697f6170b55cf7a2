//! Scheduling model, engine contract and the in-memory engine.
//!
//! - [`engine`]: the [`SchedulerEngine`] / [`EngineFactory`] contract
//! - [`memory`]: [`InMemoryEngine`], a RAM-only implementation
//! - [`history`]: [`ExecutionHistoryRecorder`], a bounded execution log
//! - [`registry`]: [`JobRegistry`] and config-driven registration

pub mod builtin;
pub mod engine;
pub mod history;
pub mod job;
pub mod key;
pub mod listener;
pub mod memory;
pub mod model;
pub mod registry;

pub use builtin::HeartbeatJob;
pub use engine::{EngineError, EngineFactory, EngineResult, SchedulerEngine};
pub use history::{ExecutionHistoryRecorder, ExecutionRecord, HISTORY_LISTENER_NAME};
pub use job::{Job, JobExecutionContext, JobExecutionError, JobFactory, JobResult};
pub use key::{JobKey, KeyError, TriggerKey, DEFAULT_GROUP};
pub use listener::JobListener;
pub use memory::{EngineSettings, InMemoryEngine, InMemoryEngineFactory, MANUAL_TRIGGER_GROUP};
pub use model::{
    EngineMetadata, JobDataMap, JobDetail, MisfireInstruction, Schedule, ScheduleKind, Trigger,
    TriggerState,
};
pub use registry::{
    register_all, register_job_from_config, register_job_with_defaults, JobRegistry, FALLBACK_CRON,
};
