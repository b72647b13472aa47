//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("delivery.connect_timeout_secs must be greater than 0")]
    ZeroTimeout,
    #[error("databases.{0}.url is required")]
    MissingDatabaseUrl(String),
    #[error("server name '{0}' is declared more than once")]
    DuplicateServerName(String),
    #[error("server id {0} is declared more than once")]
    DuplicateServerId(i64),
    #[error("server '{server}' connection '{connection}' references unknown database '{database}'")]
    UnknownDatabase {
        server: String,
        connection: String,
        database: String,
    },
    #[error("server '{0}' connection 'VIP' requires an integer sid")]
    VipSidMissing(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.delivery.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut databases: Vec<_> = config.databases.iter().collect();
    databases.sort_by(|a, b| a.0.cmp(b.0));
    for (name, db) in databases {
        if db.url.trim().is_empty() {
            errors.push(ValidationError::MissingDatabaseUrl(name.clone()));
        }
    }

    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for server in &config.servers {
        if !names.insert(server.name.as_str()) {
            errors.push(ValidationError::DuplicateServerName(server.name.clone()));
        }
        if !ids.insert(server.id) {
            errors.push(ValidationError::DuplicateServerId(server.id));
        }

        for (connection, conn) in &server.connections {
            if !config.databases.contains_key(&conn.database) {
                errors.push(ValidationError::UnknownDatabase {
                    server: server.name.clone(),
                    connection: connection.clone(),
                    database: conn.database.clone(),
                });
            }
        }

        // Mod settings rule: VIP deployments are multiplexed by sid.
        if let Some(vip) = server.connection("VIP")
            && vip.param_int("sid").is_none()
        {
            errors.push(ValidationError::VipSidMissing(server.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
