//! Login command.
//!
//! Exchanges credentials for a bearer token and stores it for later commands.

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use super::config::{CliConfig, TOKEN_KEY};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct LoginArgs {
    /// Dashboard username
    #[arg(short, long, env = "CADENCE_USERNAME")]
    username: String,

    /// Dashboard password
    #[arg(short, long, env = "CADENCE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

pub async fn execute(args: LoginArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let body = LoginRequest {
        username: &args.username,
        password: &args.password,
    };
    let resp: LoginResponse = client.post(&["auth", "login"], &body).await?;

    let mut cfg = CliConfig::load()?;
    cfg.set(TOKEN_KEY, resp.token);
    cfg.save()?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("Logged in to {} as {}", client.base_url(), args.username));
        }
        _ => output::print_item(
            &serde_json::json!({ "loggedIn": true, "username": args.username }),
            format,
        )?,
    }

    Ok(())
}
