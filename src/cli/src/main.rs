//! Cadence CLI - command-line client for the Cadence scheduler dashboard.
//!
//! Provides commands for logging in, scheduler lifecycle, jobs, triggers,
//! health and local configuration.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::{ApiClient, ApiError};
use commands::config::CliConfig;
use commands::scheduler::Lifecycle;
use commands::{config, health, jobs, login, scheduler, triggers};
use output::OutputFormat;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Cadence - scheduler control plane CLI
#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Cadence - scheduler control plane",
    long_about = "CLI tool for inspecting and controlling a Cadence scheduler: lifecycle, jobs, triggers and execution history.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "CADENCE_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login(login::LoginArgs),

    /// Show scheduler status
    Status,

    /// Start the scheduler
    Start,

    /// Put the scheduler in standby
    Standby,

    /// Shut the scheduler down (cannot be restarted)
    Shutdown {
        /// Do not wait for running jobs to finish
        #[arg(long)]
        no_wait: bool,
    },

    /// Job operations
    #[command(subcommand)]
    Jobs(jobs::JobCommands),

    /// Trigger operations
    #[command(subcommand)]
    Triggers(triggers::TriggerCommands),

    /// Check scheduler health
    Health,

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = run(cli).await;

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        if let Some(ApiError::Status {
            trace_id: Some(trace_id),
            ..
        }) = e.downcast_ref::<ApiError>()
        {
            output::print_info(&format!("Trace id: {trace_id}"));
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.output;

    // Config commands never touch the network, so a bad stored URL can be fixed.
    if let Commands::Config(cmd) = cli.command {
        return config::execute(cmd, format).await;
    }

    let settings = CliConfig::load()?;
    let api_url = cli
        .api_url
        .or_else(|| settings.api_url().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = ApiClient::new(
        &api_url,
        settings.route_prefix(),
        settings.token().map(str::to_string),
    )?;

    dispatch(cli.command, &client, format).await
}

async fn dispatch(command: Commands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Login(args) => login::execute(args, client, format).await,
        Commands::Status => scheduler::status(client, format).await,
        Commands::Start => scheduler::lifecycle(Lifecycle::Start, client, format).await,
        Commands::Standby => scheduler::lifecycle(Lifecycle::Standby, client, format).await,
        Commands::Shutdown { no_wait } => {
            let action = Lifecycle::Shutdown {
                wait_for_jobs: !no_wait,
            };
            scheduler::lifecycle(action, client, format).await
        }
        Commands::Jobs(cmd) => jobs::execute(cmd, client, format).await,
        Commands::Triggers(cmd) => triggers::execute(cmd, client, format).await,
        Commands::Health => health::execute(client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    }
}
