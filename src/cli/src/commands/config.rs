//! Configuration management commands.
//!
//! Stores CLI configuration, including the login token, in
//! `~/.cadence/config.toml`.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::output::{self, OutputFormat};

pub const API_URL_KEY: &str = "api-url";
pub const ROUTE_PREFIX_KEY: &str = "route-prefix";
pub const TOKEN_KEY: &str = "token";

const DEFAULT_ROUTE_PREFIX: &str = "cadence";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Configuration key (api-url, route-prefix, token)
        key: String,
        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show all configuration
    Show,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Persistent CLI configuration stored on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Return the path to the configuration file (`~/.cadence/config.toml`).
fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".cadence").join("config.toml"))
}

impl CliConfig {
    /// Load from the default location, returning defaults if the file does
    /// not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        // The file holds a bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", path.display()))?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn api_url(&self) -> Option<&str> {
        self.get(API_URL_KEY)
    }

    pub fn route_prefix(&self) -> &str {
        self.get(ROUTE_PREFIX_KEY).unwrap_or(DEFAULT_ROUTE_PREFIX)
    }

    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_KEY)
    }

    /// Values safe to print: the token is shortened.
    fn redacted(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| {
                let shown = if k == TOKEN_KEY { redact(v) } else { v.clone() };
                (k.clone(), shown)
            })
            .collect()
    }
}

fn redact(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{head}...")
}

pub async fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => {
            let mut cfg = CliConfig::load()?;
            cfg.set(key.clone(), value.clone());
            cfg.save()?;

            let shown = if key == TOKEN_KEY { redact(&value) } else { value };
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("{} = {}", key, shown));
                }
                _ => {
                    output::print_item(&serde_json::json!({ "key": key, "value": shown }), format)?;
                }
            }
        }

        ConfigCommands::Get { key } => {
            let cfg = CliConfig::load()?;
            match cfg.redacted().get(&key) {
                Some(value) => match format {
                    OutputFormat::Table => println!("{}", value),
                    _ => {
                        output::print_item(&serde_json::json!({ "key": key, "value": value }), format)?;
                    }
                },
                None => anyhow::bail!("Key '{}' not found", key),
            }
        }

        ConfigCommands::Show => {
            let cfg = CliConfig::load()?;

            if cfg.values.is_empty() {
                output::print_info("No configuration values set.");
                return Ok(());
            }

            match format {
                OutputFormat::Table => {
                    output::print_header("Configuration");
                    for (k, v) in &cfg.redacted() {
                        output::print_detail(k, v);
                    }
                }
                _ => output::print_item(&cfg.redacted(), format)?,
            }
        }

        ConfigCommands::Reset { force } => {
            if !force {
                output::print_warning("This will reset all CLI configuration. Use --force to confirm.");
                return Ok(());
            }

            let path = config_path()?;
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }

            output::print_success("Configuration reset to defaults");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CliConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.values.is_empty());
        assert_eq!(cfg.route_prefix(), "cadence");
        assert!(cfg.token().is_none());
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = CliConfig::default();
        cfg.set(API_URL_KEY, "http://scheduler:9090");
        cfg.set(TOKEN_KEY, "eyJhbGciOiJIUzI1NiJ9.payload.sig");
        cfg.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_url(), Some("http://scheduler:9090"));
        assert_eq!(loaded.token(), Some("eyJhbGciOiJIUzI1NiJ9.payload.sig"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_token_is_redacted() {
        let mut cfg = CliConfig::default();
        cfg.set(TOKEN_KEY, "abcdefghijklmnop");
        cfg.set(ROUTE_PREFIX_KEY, "ops");

        let shown = cfg.redacted();
        assert_eq!(shown[TOKEN_KEY], "abcdefgh...");
        assert_eq!(shown[ROUTE_PREFIX_KEY], "ops");
    }
}
