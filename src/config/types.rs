//! Core configuration types.

use super::defaults::{
    default_command_failure_policy, default_confirmation, default_connect_timeout,
    default_max_connections,
};
use crate::model::ServerTarget;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Delivery behaviour.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Named database handles referenced by server connections.
    #[serde(default)]
    pub databases: HashMap<String, DatabaseConfig>,
    /// Known game servers.
    #[serde(default)]
    pub servers: Vec<ServerTarget>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Server by display name.
    pub fn server(&self, name: &str) -> Option<&ServerTarget> {
        self.servers.iter().find(|s| s.name == name)
    }
}

/// What the generic command driver does when one command line fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandFailurePolicy {
    /// Stop the batch and fail the delivery.
    Abort,
    /// Log the failed line and continue with the next one.
    #[default]
    SkipAndLog,
}

/// How the overwrite confirmation gate is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationMode {
    /// Accept every prompt.
    #[default]
    Auto,
    /// Ask on the terminal.
    Prompt,
    /// Refuse every prompt.
    Decline,
}

/// `[delivery]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Remote console connect/read timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_failure_policy")]
    pub command_failure_policy: CommandFailurePolicy,
    #[serde(default = "default_confirmation")]
    pub confirmation: ConfirmationMode,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            command_failure_policy: default_command_failure_policy(),
            confirmation: default_confirmation(),
        }
    }
}

impl DeliveryConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// `[databases.<name>]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`mysql://...` or `sqlite:...`).
    pub url: String,
    /// Table prefix of this deployment, overriding the driver default.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}
