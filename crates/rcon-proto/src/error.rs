//! Error types for the remote console protocol.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while framing or parsing protocol data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// An I/O error occurred while reading or writing a frame.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The declared packet size is outside the range the protocol allows.
    #[error("invalid packet size {size} (allowed {min}..={max})")]
    InvalidSize {
        /// Size field read from the wire.
        size: i32,
        /// Smallest legal size.
        min: i32,
        /// Largest legal size.
        max: i32,
    },

    /// A packet body was not terminated by the two trailing NUL bytes.
    #[error("packet {id} is missing its NUL terminator")]
    MissingTerminator {
        /// Request id of the offending packet.
        id: i32,
    },

    /// An outgoing body contains an interior NUL byte and cannot be framed.
    #[error("command contains an interior NUL byte at offset {0}")]
    InteriorNul(usize),

    /// An outgoing body is longer than a single packet can carry.
    #[error("command too long: {actual} bytes (limit {limit})")]
    BodyTooLong {
        /// Body length in bytes.
        actual: usize,
        /// Maximum body length.
        limit: usize,
    },

    /// A connectionless datagram did not start with the `0xFFFFFFFF` header.
    #[error("datagram is missing the connectionless header")]
    MissingHeader,

    /// The server answered a challenge request with something unexpected.
    #[error("unexpected challenge response: {0:?}")]
    BadChallenge(String),
}

/// Errors surfaced by [`crate::RconClient`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RconError {
    /// Transport-level failure (connect refused, reset, broken pipe).
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent data that could not be framed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A stage did not complete within the configured timeout.
    #[error("timed out while {0}")]
    Timeout(&'static str),

    /// The server rejected the shared secret.
    #[error("RCON authorization failed")]
    Authentication,

    /// The connection was closed by the server mid-exchange.
    #[error("connection closed by server")]
    Closed,

    /// An operation was attempted in the wrong lifecycle state.
    #[error("invalid state: {operation} requires {required}, client is {actual}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the operation requires.
        required: &'static str,
        /// State the client was in.
        actual: &'static str,
    },
}

impl RconError {
    /// Get a static error code string for log labelling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
            Self::Timeout(_) => "timeout",
            Self::Authentication => "authentication",
            Self::Closed => "closed",
            Self::InvalidState { .. } => "invalid_state",
        }
    }
}
