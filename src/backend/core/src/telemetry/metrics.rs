//! Prometheus metrics.
//!
//! [`init_metrics`] installs the global recorder; components then record
//! through the `metrics` macros. The returned [`MetricsRegistry`] renders the
//! scrape body served at `/metrics`.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Buckets for job durations, in seconds.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Handle to the installed recorder. Empty when metrics are disabled.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl MetricsRegistry {
    /// A registry with no recorder behind it.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics(enabled: bool, service_name: &str) -> anyhow::Result<MetricsRegistry> {
    if !enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let handle = PrometheusBuilder::new()
        .add_global_label("service", service_name)
        .set_buckets(DURATION_BUCKETS)?
        .install_recorder()?;

    register_metric_descriptions();

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_counter!(
        "cadence_job_executions_total",
        "Completed job executions by job and outcome"
    );
    describe_counter!(
        "cadence_job_vetoes_total",
        "Job fires vetoed because the job was still running"
    );
    describe_histogram!(
        "cadence_job_duration_seconds",
        "Job execution duration in seconds"
    );
    describe_counter!("cadence_auth_failures_total", "Rejected login attempts");
    describe_counter!(
        "cadence_errors_total",
        "Errors raised, by error code and class"
    );
    describe_counter!(
        "cadence_lifecycle_transitions_total",
        "Scheduler lifecycle transitions by target state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_registry_renders_nothing() {
        let registry = init_metrics(false, "cadence-test").unwrap();
        assert!(!registry.is_enabled());
        assert!(registry.render().is_empty());
    }
}
