//! Telemetry: structured logging, distributed tracing and metrics.
//!
//! [`init`] installs the global `tracing` subscriber: an `EnvFilter` (from
//! `RUST_LOG`, falling back to the configured level), a JSON or pretty `fmt`
//! layer, and an OpenTelemetry layer exporting over OTLP when an endpoint is
//! configured. [`shutdown`] flushes pending spans.

pub mod metrics;

pub use self::metrics::{init_metrics, MetricsRegistry};

use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ObservabilityConfig;

/// Initialize logging and tracing. Call once at startup.
pub fn init(service_name: &str, config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let fmt_layer = if config.json_logging {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().pretty().boxed()
    };

    let otel_layer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                    opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", service_name.to_string()),
                        opentelemetry::KeyValue::new(
                            "service.version",
                            env!("CARGO_PKG_VERSION").to_string(),
                        ),
                    ]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    tracing::info!(
        service_name,
        otlp = config.otlp_endpoint.is_some(),
        json = config.json_logging,
        "Telemetry initialized"
    );

    Ok(())
}

/// Flush and shut down the OpenTelemetry tracer provider.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}
