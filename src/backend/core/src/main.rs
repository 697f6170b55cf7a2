//! Cadence Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cadence_core::{
    api::{self, AppState},
    auth::AuthGateway,
    config::Config,
    controller::SchedulerController,
    scheduler::{
        EngineSettings, ExecutionHistoryRecorder, HeartbeatJob, InMemoryEngineFactory,
        JobRegistry,
    },
    telemetry::{self, metrics::init_metrics},
};

const SERVICE_NAME: &str = "cadence-server";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    telemetry::init(SERVICE_NAME, &config.observability)?;
    let metrics = init_metrics(config.observability.metrics_enabled, SERVICE_NAME)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        scheduler = %config.scheduler.name,
        "Starting Cadence server"
    );

    let auth = Arc::new(AuthGateway::new(&config.auth)?);

    let registry = JobRegistry::builder().with_job::<HeartbeatJob>().build();
    tracing::info!(job_types = registry.len(), "Job registry built");

    let factory = Arc::new(InMemoryEngineFactory::new(
        EngineSettings::from(&config.scheduler),
        registry,
        config.jobs.clone(),
    ));
    let history = Arc::new(ExecutionHistoryRecorder::new(config.scheduler.history_capacity));
    let controller = Arc::new(
        SchedulerController::new(factory, history)
            .with_wait_for_jobs_on_stop(config.scheduler.wait_for_jobs_on_stop),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    if let Err(e) = controller.start(&shutdown).await {
        tracing::error!(error = %e, "Scheduler failed to start");
        telemetry::shutdown();
        return Err(e.into());
    }

    let app_state = AppState {
        controller: Arc::clone(&controller),
        auth,
        metrics,
    };
    let app = api::build_router(app_state, &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, api_base = %config.server.api_base(), "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.cancelled().await }
        })
        .await?;

    // Cleanup
    if let Err(e) = controller.stop(&CancellationToken::new()).await {
        tracing::error!(error = %e, "Scheduler did not stop cleanly");
    }
    telemetry::shutdown();
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
