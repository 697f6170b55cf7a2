//! Job commands.
//!
//! Keys are `group.name`; a bare name means the `DEFAULT` group.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum JobCommands {
    /// List registered jobs
    List,

    /// Show recent executions, newest first
    History {
        /// Number of records
        #[arg(short, long, default_value = "50")]
        count: usize,
    },

    /// Pause every trigger of a job
    Pause {
        /// Job key (group.name or name)
        key: String,
    },

    /// Resume every trigger of a job
    Resume {
        /// Job key (group.name or name)
        key: String,
    },

    /// Fire a job once, now
    Trigger {
        /// Job key (group.name or name)
        key: String,
    },

    /// Delete a job and its triggers
    Delete {
        /// Job key (group.name or name)
        key: String,
    },
}

// ── API types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobSummary {
    job_key: String,
    job_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    disallow_concurrent_execution: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_fire_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_fire_time: Option<DateTime<Utc>>,
    trigger_count: usize,
    #[serde(default)]
    job_data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Tabled)]
struct JobRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Type")]
    job_type: String,
    #[tabled(rename = "Next Fire")]
    next_fire: String,
    #[tabled(rename = "Previous Fire")]
    previous_fire: String,
    #[tabled(rename = "Triggers")]
    triggers: usize,
    #[tabled(rename = "Concurrent")]
    concurrent: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionRecord {
    id: String,
    job_key: String,
    #[serde(default)]
    job_name: String,
    #[serde(default)]
    job_group: String,
    trigger_key: String,
    #[serde(default)]
    trigger_name: String,
    #[serde(default)]
    trigger_group: String,
    fire_time: DateTime<Utc>,
    duration: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPage {
    total_count: usize,
    items: Vec<ExecutionRecord>,
}

#[derive(Debug, Tabled)]
struct HistoryRow {
    #[tabled(rename = "Fired")]
    fire_time: String,
    #[tabled(rename = "Job")]
    job_key: String,
    #[tabled(rename = "Trigger")]
    trigger_key: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct MessageResponse {
    message: String,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: JobCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let resp: MessageResponse = match cmd {
        JobCommands::List => {
            let jobs: Vec<JobSummary> = client.get(&["jobs"]).await?;
            let rows: Vec<JobRow> = jobs
                .iter()
                .map(|j| JobRow {
                    key: j.job_key.clone(),
                    job_type: j.job_type.clone(),
                    next_fire: output::format_time(j.next_fire_time),
                    previous_fire: output::format_time(j.previous_fire_time),
                    triggers: j.trigger_count,
                    concurrent: output::yes_no(!j.disallow_concurrent_execution),
                })
                .collect();
            return output::print_list(&rows, &jobs, format);
        }

        JobCommands::History { count } => {
            let page: HistoryPage = client
                .get_with_query(&["jobs", "history"], &[("count", count)])
                .await?;
            let rows: Vec<HistoryRow> = page
                .items
                .iter()
                .map(|r| HistoryRow {
                    fire_time: output::format_time(Some(r.fire_time)),
                    job_key: r.job_key.clone(),
                    trigger_key: r.trigger_key.clone(),
                    duration: r.duration.clone(),
                    result: if r.success {
                        "ok".to_string()
                    } else {
                        "failed".to_string()
                    },
                    error: r.error_message.clone().unwrap_or_default(),
                })
                .collect();
            return output::print_list(&rows, &page, format);
        }

        JobCommands::Pause { key } => action(client, &key, "pause").await?,
        JobCommands::Resume { key } => action(client, &key, "resume").await?,
        JobCommands::Trigger { key } => action(client, &key, "trigger").await?,
        JobCommands::Delete { key } => client.delete(&["jobs", &key]).await?,
    };

    match format {
        OutputFormat::Table => output::print_success(&resp.message),
        _ => output::print_item(&resp, format)?,
    }

    Ok(())
}

async fn action(client: &ApiClient, key: &str, verb: &str) -> Result<MessageResponse> {
    client
        .post_empty(&["jobs", key, verb], &[] as &[(&str, &str)])
        .await
}
