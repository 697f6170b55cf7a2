//! Scheduler status and lifecycle commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct SchedulerStatus {
    scheduler_name: String,
    scheduler_instance_id: String,
    is_started: bool,
    is_shutdown: bool,
    is_standby_mode: bool,
    job_store_type: String,
    thread_pool_type: String,
    thread_pool_size: usize,
    version: String,
    state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    running_since: Option<DateTime<Utc>>,
    #[serde(default)]
    jobs_executed: u64,
}

#[derive(Debug, Deserialize, Serialize)]
struct LifecycleResponse {
    success: bool,
    message: String,
}

/// The lifecycle transitions a user can request.
#[derive(Debug, Clone, Copy)]
pub enum Lifecycle {
    Start,
    Standby,
    Shutdown { wait_for_jobs: bool },
}

pub async fn status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: SchedulerStatus = client.get(&["scheduler", "status"]).await?;

    match format {
        OutputFormat::Table => {
            output::print_header(&format!("Scheduler: {}", status.scheduler_name));
            output::print_detail("State", &status.state);
            output::print_detail("Instance", &status.scheduler_instance_id);
            output::print_detail("Started", &output::yes_no(status.is_started));
            output::print_detail("Standby", &output::yes_no(status.is_standby_mode));
            output::print_detail("Shut down", &output::yes_no(status.is_shutdown));
            output::print_detail("Running since", &output::format_time(status.running_since));
            output::print_detail("Jobs executed", &status.jobs_executed.to_string());
            output::print_detail("Job store", &status.job_store_type);
            output::print_detail(
                "Thread pool",
                &format!("{} ({})", status.thread_pool_type, status.thread_pool_size),
            );
            output::print_detail("Version", &status.version);
        }
        _ => output::print_item(&status, format)?,
    }

    Ok(())
}

pub async fn lifecycle(action: Lifecycle, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let resp: LifecycleResponse = match action {
        Lifecycle::Start => {
            client
                .post_empty(&["scheduler", "start"], &[] as &[(&str, bool)])
                .await?
        }
        Lifecycle::Standby => {
            client
                .post_empty(&["scheduler", "standby"], &[] as &[(&str, bool)])
                .await?
        }
        Lifecycle::Shutdown { wait_for_jobs } => {
            client
                .post_empty(
                    &["scheduler", "shutdown"],
                    &[("waitForJobsToComplete", wait_for_jobs)],
                )
                .await?
        }
    };

    match format {
        OutputFormat::Table if resp.success => output::print_success(&resp.message),
        OutputFormat::Table => output::print_info(&resp.message),
        _ => output::print_item(&resp, format)?,
    }

    Ok(())
}
