//! Health check command.
//!
//! Queries the unauthenticated `/health` endpoint.

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (status_code, health) = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let field = |name: &str| health.get(name).and_then(|v| v.as_str()).unwrap_or("unknown");
            let status = field("status");

            output::print_header("Scheduler Health");
            output::print_detail("Status", status);
            output::print_detail("State", field("state"));
            output::print_detail("API URL", client.base_url());
            output::print_detail("Version", field("version"));
            output::print_detail("Timestamp", field("timestamp"));

            if status_code.is_success() && status == "healthy" {
                output::print_success("Scheduler is serving");
            } else {
                anyhow::bail!("Scheduler is not serving (state: {})", field("state"));
            }
        }
        _ => {
            output::print_item(&health, format)?;
            if !status_code.is_success() {
                anyhow::bail!("Health check returned {status_code}");
            }
        }
    }

    Ok(())
}
