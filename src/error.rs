//! Unified error handling for grant delivery.
//!
//! Every driver returns [`DeliveryError`]. Validation failures are raised
//! before any store mutation; store errors propagate unchanged; remote-console
//! errors are fatal only where a driver says so.

use crate::store::StoreError;
use rcon_proto::RconError;
use thiserror::Error;

// ============================================================================
// Delivery Errors
// ============================================================================

/// Errors that can occur while delivering a grant.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Missing connection, missing/invalid parameter, unknown group id.
    #[error("bad configuration: {0}")]
    BadConfiguration(String),

    /// The user has no linked identity of the required platform.
    #[error("user has no linked {0} account")]
    IdentityMissing(String),

    /// Remote console connect/authenticate/execute failure.
    #[error("delivery protocol error: {0}")]
    Protocol(#[from] RconError),

    /// Registry dispatch on an alias nobody registered.
    #[error("driver '{0}' does not exist")]
    UnknownDriver(String),

    /// The confirmation gate refused to overwrite an existing grant.
    #[error("confirmation declined: {0}")]
    ConfirmationDeclined(String),

    /// Reading or writing the grant store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DeliveryError {
    /// Shorthand for [`DeliveryError::BadConfiguration`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::BadConfiguration(msg.into())
    }

    /// Get a static error code string for log labelling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadConfiguration(_) => "bad_configuration",
            Self::IdentityMissing(_) => "identity_missing",
            Self::Protocol(_) => "protocol",
            Self::UnknownDriver(_) => "unknown_driver",
            Self::ConfirmationDeclined(_) => "confirmation_declined",
            Self::Store(_) => "store",
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Configuration and identity problems need a human; transport and
    /// database faults may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Store(_))
    }
}

/// Result type for driver deliveries.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DeliveryError::config("group").error_code(), "bad_configuration");
        assert_eq!(
            DeliveryError::UnknownDriver("x".into()).error_code(),
            "unknown_driver"
        );
        assert_eq!(
            DeliveryError::Protocol(RconError::Authentication).error_code(),
            "protocol"
        );
    }

    #[test]
    fn test_display_wraps_transport_message() {
        let err = DeliveryError::from(RconError::Timeout("connecting"));
        assert_eq!(
            err.to_string(),
            "delivery protocol error: timed out while connecting"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(!DeliveryError::config("group").is_retryable());
        assert!(!DeliveryError::IdentityMissing("Steam".into()).is_retryable());
        assert!(DeliveryError::Protocol(RconError::Closed).is_retryable());
    }
}
