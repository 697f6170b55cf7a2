//! Subcommand implementations.
pub mod config;
pub mod health;
pub mod jobs;
pub mod login;
pub mod scheduler;
pub mod triggers;
