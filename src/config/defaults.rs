//! Default value functions for configuration.

use super::{CommandFailurePolicy, ConfirmationMode};

// =============================================================================
// Delivery Defaults
// =============================================================================

/// Remote console timeout; a few seconds keeps a dead server from stalling a delivery.
pub fn default_connect_timeout() -> u64 {
    3
}

pub fn default_command_failure_policy() -> CommandFailurePolicy {
    CommandFailurePolicy::SkipAndLog
}

pub fn default_confirmation() -> ConfirmationMode {
    ConfirmationMode::Auto
}

// =============================================================================
// Database Defaults
// =============================================================================

/// One delivery runs at a time, so pools stay small.
pub fn default_max_connections() -> u32 {
    2
}
