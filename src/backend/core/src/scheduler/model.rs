//! Jobs, triggers and schedules as stored by an engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::key::{JobKey, TriggerKey};
use crate::error::{CadenceError, ErrorCode};

/// Opaque per-job data handed to every execution.
pub type JobDataMap = BTreeMap<String, serde_json::Value>;

// ═══════════════════════════════════════════════════════════════════════════════
// Schedule Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidCron { expression: String, message: String },

    #[error("Repeating simple schedules need a non-zero interval")]
    ZeroInterval,
}

impl From<ScheduleError> for CadenceError {
    fn from(error: ScheduleError) -> Self {
        CadenceError::new(ErrorCode::InvalidSchedule, error.to_string()).with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Detail
// ═══════════════════════════════════════════════════════════════════════════════

/// A job as registered with the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetail {
    pub key: JobKey,
    /// Registered implementation name, resolved through the job factory
    pub job_type: String,
    pub description: Option<String>,
    /// Kept when it has no triggers left
    pub durable: bool,
    /// Re-executed after an unclean shutdown, if the store supports it
    pub requests_recovery: bool,
    /// At most one execution in flight; extra fires are vetoed
    pub disallow_concurrent_execution: bool,
    pub data: JobDataMap,
}

impl JobDetail {
    pub fn new(key: JobKey, job_type: impl Into<String>) -> Self {
        Self {
            key,
            job_type: job_type.into(),
            description: None,
            durable: true,
            requests_recovery: false,
            disallow_concurrent_execution: false,
            data: JobDataMap::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_data(mut self, data: JobDataMap) -> Self {
        self.data = data;
        self
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn disallow_concurrent_execution(mut self, disallow: bool) -> Self {
        self.disallow_concurrent_execution = disallow;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Schedules
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed cron expression (seconds first, 6 or 7 fields).
///
/// Quartz-style `?` placeholders are accepted and treated as `*`.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let expression = expression.trim();
        let normalized = expression.replace('?', "*");

        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
            ScheduleError::InvalidCron {
                expression: expression.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The expression as written.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

/// Kind of schedule driving a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleKind {
    Cron,
    Simple,
}

impl ScheduleKind {
    /// Type name reported for triggers of this kind.
    pub const fn trigger_type(&self) -> &'static str {
        match self {
            Self::Cron => "CronTrigger",
            Self::Simple => "SimpleTrigger",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    Cron(CronSchedule),
    /// Fires every `interval`; `repeat_count` extra fires after the first,
    /// forever when `None`.
    Simple {
        interval: Duration,
        repeat_count: Option<u32>,
    },
}

impl Schedule {
    pub fn cron(expression: &str) -> Result<Self, ScheduleError> {
        CronSchedule::parse(expression).map(Self::Cron)
    }

    pub fn simple(interval: Duration, repeat_count: Option<u32>) -> Result<Self, ScheduleError> {
        if interval.is_zero() && repeat_count != Some(0) {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self::Simple {
            interval,
            repeat_count,
        })
    }

    /// A single fire.
    pub fn once() -> Self {
        Self::Simple {
            interval: Duration::ZERO,
            repeat_count: Some(0),
        }
    }

    pub fn kind(&self) -> ScheduleKind {
        match self {
            Self::Cron(_) => ScheduleKind::Cron,
            Self::Simple { .. } => ScheduleKind::Simple,
        }
    }

    pub fn cron_expression(&self) -> Option<&str> {
        match self {
            Self::Cron(cron) => Some(cron.expression()),
            Self::Simple { .. } => None,
        }
    }

    /// First fire time at or after `start`.
    fn first_fire_time(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Cron(cron) => cron.next_after(&(start - chrono::Duration::milliseconds(1))),
            Self::Simple { .. } => Some(start),
        }
    }

    /// Fire time following a fire at `fired_at`, given how many fires happened.
    fn fire_time_after(&self, fired_at: DateTime<Utc>, times_triggered: u32) -> Option<DateTime<Utc>> {
        match self {
            Self::Cron(cron) => cron.next_after(&fired_at),
            Self::Simple {
                interval,
                repeat_count,
            } => {
                if let Some(repeats) = repeat_count {
                    if times_triggered > *repeats {
                        return None;
                    }
                }
                let interval = chrono::Duration::from_std(*interval).ok()?;
                Some(fired_at + interval)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Triggers
// ═══════════════════════════════════════════════════════════════════════════════

/// What to do when a trigger's fire time was missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MisfireInstruction {
    /// Cron: skip to the next time. Simple: fire now.
    #[default]
    Smart,
    /// Fire immediately, however late.
    IgnoreMisfires,
    /// Fire once now, then continue the schedule.
    FireNow,
    /// Skip missed fires.
    DoNothing,
}

/// Current state of a trigger as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerState {
    Normal,
    Paused,
    Complete,
    Error,
    Blocked,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub description: Option<String>,
    pub schedule: Schedule,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub misfire_instruction: MisfireInstruction,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub times_triggered: u32,
}

impl Trigger {
    pub fn new(key: TriggerKey, job_key: JobKey, schedule: Schedule) -> Self {
        Self {
            key,
            job_key,
            description: None,
            schedule,
            start_time: Utc::now(),
            end_time: None,
            misfire_instruction: MisfireInstruction::default(),
            next_fire_time: None,
            previous_fire_time: None,
            times_triggered: 0,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = start;
        self
    }

    pub fn ending_at(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.end_time = end;
        self
    }

    pub fn with_misfire_instruction(mut self, instruction: MisfireInstruction) -> Self {
        self.misfire_instruction = instruction;
        self
    }

    fn within_end(&self, at: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        at.filter(|t| self.end_time.map_or(true, |end| *t <= end))
    }

    /// Compute the first fire time. Returns `None` when the trigger can never fire.
    pub fn compute_first_fire_time(&mut self) -> Option<DateTime<Utc>> {
        self.next_fire_time = self.within_end(self.schedule.first_fire_time(self.start_time));
        self.next_fire_time
    }

    /// Record a fire at `fired_at` and advance to the following fire time.
    pub fn triggered(&mut self, fired_at: DateTime<Utc>) {
        self.times_triggered += 1;
        self.previous_fire_time = Some(fired_at);
        self.next_fire_time =
            self.within_end(self.schedule.fire_time_after(fired_at, self.times_triggered));
    }

    /// Skip every fire time up to `now`.
    pub fn skip_missed(&mut self, now: DateTime<Utc>) {
        self.next_fire_time = match &self.schedule {
            Schedule::Cron(cron) => self.within_end(cron.next_after(&now)),
            Schedule::Simple { .. } => self.within_end(Some(now)),
        };
    }

    /// Whether a miss at `now` should fire immediately rather than skip.
    pub fn fires_on_misfire(&self) -> bool {
        match (self.misfire_instruction, self.schedule.kind()) {
            (MisfireInstruction::DoNothing, _) => false,
            (MisfireInstruction::Smart, ScheduleKind::Cron) => false,
            _ => true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine Metadata
// ═══════════════════════════════════════════════════════════════════════════════

/// Descriptive snapshot of an engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineMetadata {
    pub scheduler_name: String,
    pub instance_id: String,
    pub started: bool,
    pub shutdown: bool,
    pub standby: bool,
    pub job_store_type: String,
    pub thread_pool_type: String,
    pub thread_pool_size: usize,
    pub version: String,
    pub running_since: Option<DateTime<Utc>>,
    pub jobs_executed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_quartz_placeholder_accepted() {
        let cron = CronSchedule::parse("0/30 * * * * ?").unwrap();
        assert_eq!(cron.expression(), "0/30 * * * * ?");
        assert_eq!(cron.next_after(&at(10, 0, 5)), Some(at(10, 0, 30)));
        assert_eq!(cron.next_after(&at(10, 0, 30)), Some(at(10, 1, 0)));
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let err = CronSchedule::parse("every tuesday").unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidCron { .. }));
    }

    #[test]
    fn test_cron_first_fire_includes_start() {
        let mut trigger = Trigger::new(
            TriggerKey::with_default_group("t"),
            JobKey::with_default_group("j"),
            Schedule::cron("0 * * * * *").unwrap(),
        )
        .starting_at(at(9, 0, 0));

        assert_eq!(trigger.compute_first_fire_time(), Some(at(9, 0, 0)));
        trigger.triggered(at(9, 0, 0));
        assert_eq!(trigger.next_fire_time, Some(at(9, 1, 0)));
        assert_eq!(trigger.previous_fire_time, Some(at(9, 0, 0)));
    }

    #[test]
    fn test_simple_repeat_count() {
        let mut trigger = Trigger::new(
            TriggerKey::with_default_group("t"),
            JobKey::with_default_group("j"),
            Schedule::simple(Duration::from_secs(10), Some(1)).unwrap(),
        )
        .starting_at(at(9, 0, 0));

        trigger.compute_first_fire_time();
        trigger.triggered(at(9, 0, 0));
        assert_eq!(trigger.next_fire_time, Some(at(9, 0, 10)));
        trigger.triggered(at(9, 0, 10));
        assert_eq!(trigger.next_fire_time, None);
    }

    #[test]
    fn test_end_time_bounds_fires() {
        let mut trigger = Trigger::new(
            TriggerKey::with_default_group("t"),
            JobKey::with_default_group("j"),
            Schedule::cron("0 0 * * * *").unwrap(),
        )
        .starting_at(at(9, 30, 0))
        .ending_at(Some(at(9, 45, 0)));

        assert_eq!(trigger.compute_first_fire_time(), None);
    }

    #[test]
    fn test_zero_interval_only_for_single_fire() {
        assert!(Schedule::simple(Duration::ZERO, None).is_err());
        assert!(Schedule::simple(Duration::ZERO, Some(0)).is_ok());
    }

    #[test]
    fn test_misfire_policy() {
        let cron = Trigger::new(
            TriggerKey::with_default_group("t"),
            JobKey::with_default_group("j"),
            Schedule::cron("0 * * * * *").unwrap(),
        );
        assert!(!cron.fires_on_misfire());
        assert!(cron
            .clone()
            .with_misfire_instruction(MisfireInstruction::FireNow)
            .fires_on_misfire());

        let simple = Trigger::new(
            TriggerKey::with_default_group("t"),
            JobKey::with_default_group("j"),
            Schedule::once(),
        );
        assert!(simple.fires_on_misfire());
    }
}
