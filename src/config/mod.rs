//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, DeliveryConfig, DatabaseConfig)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks collecting every problem found
//! - [`request`]: the one-shot request file read by the CLI

pub mod defaults;
mod request;
mod types;
pub mod validation;

pub use request::RequestFile;
pub use types::{
    CommandFailurePolicy, Config, ConfigError, ConfirmationMode, DatabaseConfig, DeliveryConfig,
};
pub use validation::{ValidationError, validate};
