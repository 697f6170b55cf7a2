//! Configuration management.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `config/cadence.{toml,yaml,json}` file, then `CADENCE__SECTION__KEY`
//! environment variables.

use serde::Deserialize;
use std::time::Duration;

use crate::error::CadenceError;
use crate::scheduler::JobDataMap;

const ENV_PREFIX: &str = "CADENCE";
const DEFAULT_CONFIG_FILE: &str = "config/cadence";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Job registration entries
    #[serde(default)]
    pub jobs: Vec<JobConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// First path segment of every API route
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            route_prefix: default_route_prefix(),
        }
    }
}

impl ServerConfig {
    /// `/{route_prefix}/api`, tolerating stray slashes in the setting.
    pub fn api_base(&self) -> String {
        let prefix = self.route_prefix.trim_matches('/');
        if prefix.is_empty() {
            "/api".to_string()
        } else {
            format!("/{prefix}/api")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,

    pub password: Option<String>,

    /// HS256 signing secret; generated per process when absent
    pub secret: Option<String>,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_audience")]
    pub audience: String,

    #[serde(default = "default_token_expiry_minutes")]
    pub token_expiry_minutes: i64,
}

impl AuthConfig {
    /// Token lifetime, `None` when the configured minutes overflow.
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_minutes(self.token_expiry_minutes)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            secret: None,
            issuer: default_issuer(),
            audience: default_audience(),
            token_expiry_minutes: default_token_expiry_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_name")]
    pub name: String,

    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    /// Maximum concurrent job executions
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,

    /// Execution records kept in memory
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_misfire_threshold", with = "humantime_serde")]
    pub misfire_threshold: Duration,

    /// Whether process shutdown waits for running jobs
    #[serde(default = "default_true")]
    pub wait_for_jobs_on_stop: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: default_scheduler_name(),
            instance_id: default_instance_id(),
            thread_pool_size: default_thread_pool_size(),
            history_capacity: default_history_capacity(),
            misfire_threshold: default_misfire_threshold(),
            wait_for_jobs_on_stop: true,
        }
    }
}

/// One job registration entry. Unset fields fall back to defaults
/// independently of each other.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobConfig {
    /// Registered job type, bare (`HeartbeatJob`) or path-qualified
    pub job_type: String,

    pub name: Option<String>,

    pub group: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub data: JobDataMap,

    #[serde(default)]
    pub disallow_concurrent_execution: bool,

    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerConfig {
    pub name: Option<String>,

    pub group: Option<String>,

    pub cron_expression: Option<String>,

    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// OpenTelemetry OTLP endpoint
    pub otlp_endpoint: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_true")]
    pub json_logging: bool,

    /// Install the Prometheus recorder
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: default_log_level(),
            json_logging: true,
            metrics_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_route_prefix() -> String {
    "cadence".to_string()
}

fn default_issuer() -> String {
    "CadenceDashboard".to_string()
}

fn default_audience() -> String {
    "CadenceDashboardUsers".to_string()
}

fn default_token_expiry_minutes() -> i64 {
    60
}

fn default_scheduler_name() -> String {
    "CadenceScheduler".to_string()
}

fn default_instance_id() -> String {
    "NON_CLUSTERED".to_string()
}

fn default_thread_pool_size() -> usize {
    10
}

fn default_history_capacity() -> usize {
    crate::scheduler::history::DEFAULT_HISTORY_CAPACITY
}

fn default_misfire_threshold() -> Duration {
    Duration::from_secs(60)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load from the default config file (if present) and the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(Self::environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that deserialize but cannot be used.
    pub fn validate(&self) -> crate::Result<()> {
        if self.auth.token_ttl().is_none() {
            return Err(CadenceError::configuration(format!(
                "auth.token_expiry_minutes out of range: {}",
                self.auth.token_expiry_minutes
            )));
        }
        Ok(())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.api_base(), "/cadence/api");
        assert_eq!(config.auth.token_expiry_minutes, 60);
        assert_eq!(config.scheduler.history_capacity, 100);
        assert_eq!(config.scheduler.misfire_threshold, Duration::from_secs(60));
        assert!(config.scheduler.wait_for_jobs_on_stop);
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_api_base_trims_slashes() {
        let server = ServerConfig {
            route_prefix: "/ops/".into(),
            ..ServerConfig::default()
        };
        assert_eq!(server.api_base(), "/ops/api");

        let bare = ServerConfig {
            route_prefix: String::new(),
            ..ServerConfig::default()
        };
        assert_eq!(bare.api_base(), "/api");
    }

    #[test]
    fn test_out_of_range_token_expiry_fails_loading() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[auth]\ntoken_expiry_minutes = {}", i64::MAX).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("token_expiry_minutes"));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090
route_prefix = "ops"

[auth]
username = "admin"
password = "pw"

[scheduler]
thread_pool_size = 4
misfire_threshold = "30s"

[[jobs]]
job_type = "HeartbeatJob"
group = "system"
data = {{ message = "hello" }}

[[jobs.triggers]]
cron_expression = "0 0/5 * * * ?"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.api_base(), "/ops/api");
        assert_eq!(config.auth.username.as_deref(), Some("admin"));
        assert_eq!(config.scheduler.thread_pool_size, 4);
        assert_eq!(config.scheduler.misfire_threshold, Duration::from_secs(30));
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].group.as_deref(), Some("system"));
        assert_eq!(config.jobs[0].data["message"], "hello");
        assert_eq!(
            config.jobs[0].triggers[0].cron_expression.as_deref(),
            Some("0 0/5 * * * ?")
        );
    }
}
