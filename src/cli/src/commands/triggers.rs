//! Trigger commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum TriggerCommands {
    /// List all triggers
    List,

    /// Pause a trigger
    Pause {
        /// Trigger key (group.name or name)
        key: String,
    },

    /// Resume a trigger
    Resume {
        /// Trigger key (group.name or name)
        key: String,
    },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerSummary {
    trigger_key: String,
    job_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_fire_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_fire_time: Option<DateTime<Utc>>,
    trigger_state: String,
    trigger_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repeat_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repeat_count: Option<i64>,
}

impl TriggerSummary {
    fn schedule(&self) -> String {
        if let Some(cron) = &self.cron_expression {
            return cron.clone();
        }
        match (self.repeat_interval_ms, self.repeat_count) {
            (Some(ms), Some(-1)) => format!("every {ms}ms"),
            (Some(ms), Some(n)) => format!("every {ms}ms, {n} repeats"),
            _ => "-".to_string(),
        }
    }
}

#[derive(Debug, Tabled)]
struct TriggerRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Type")]
    trigger_type: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Schedule")]
    schedule: String,
    #[tabled(rename = "Next Fire")]
    next_fire: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct MessageResponse {
    message: String,
}

pub async fn execute(cmd: TriggerCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (key, verb) = match cmd {
        TriggerCommands::List => {
            let triggers: Vec<TriggerSummary> = client.get(&["triggers"]).await?;
            let rows: Vec<TriggerRow> = triggers
                .iter()
                .map(|t| TriggerRow {
                    key: t.trigger_key.clone(),
                    job: t.job_key.clone(),
                    trigger_type: t.trigger_type.clone(),
                    state: t.trigger_state.clone(),
                    schedule: t.schedule(),
                    next_fire: output::format_time(t.next_fire_time),
                })
                .collect();
            return output::print_list(&rows, &triggers, format);
        }
        TriggerCommands::Pause { key } => (key, "pause"),
        TriggerCommands::Resume { key } => (key, "resume"),
    };

    let resp: MessageResponse = client
        .post_empty(&["triggers", &key, verb], &[] as &[(&str, &str)])
        .await?;

    match format {
        OutputFormat::Table => output::print_success(&resp.message),
        _ => output::print_item(&resp, format)?,
    }

    Ok(())
}
