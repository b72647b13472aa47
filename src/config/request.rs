//! One-shot delivery request read by the CLI.

use super::{Config, ConfigError};
use crate::error::DeliveryError;
use crate::model::{GrantRequest, Params, UserIdentity};
use serde::Deserialize;
use std::path::Path;

/// A request file:
///
/// ```toml
/// driver = "vip"
/// server = "Public #1"
/// time_override = 3600
///
/// [user]
/// name = "alice"
/// socials.Steam = "STEAM_1:1:22202"
///
/// [params]
/// group = "gold"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RequestFile {
    pub driver: String,
    /// Name of a server declared in the config.
    pub server: String,
    pub user: UserIdentity,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub time_override: Option<u64>,
    #[serde(default)]
    pub skip_confirmation: bool,
}

impl RequestFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Resolve the server name against `config`.
    pub fn into_request(self, config: &Config) -> Result<GrantRequest, DeliveryError> {
        let server = config
            .server(&self.server)
            .cloned()
            .ok_or_else(|| DeliveryError::config(format!("server '{}' is not configured", self.server)))?;

        Ok(GrantRequest {
            driver: self.driver,
            user: self.user,
            server,
            params: self.params,
            time_override: self.time_override,
            skip_confirmation: self.skip_confirmation,
        })
    }
}
