//! Source RCON packet model.
//!
//! ```text
//! +----------+----------+----------+----------------+------+
//! | size i32 |  id i32  | type i32 | body (ASCII) 0 |  0   |
//! +----------+----------+----------+----------------+------+
//! ```
//!
//! All integers are little-endian. `size` counts every byte after itself, so an
//! empty body yields a size of 10.

/// Packet type sent by the client to log in.
pub const SERVERDATA_AUTH: i32 = 3;
/// Packet type the server uses to answer [`SERVERDATA_AUTH`].
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
/// Packet type sent by the client to execute a console command.
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
/// Packet type carrying command output (and the empty pre-auth reply).
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Size of a packet with an empty body.
pub const MIN_PACKET_SIZE: i32 = 10;
/// Largest size field accepted from a server.
pub const MAX_PACKET_SIZE: i32 = 8192;
/// Largest command body the client will frame.
pub const MAX_BODY_LEN: usize = 4086;

/// The id a server places in an auth response when the secret is wrong.
pub const AUTH_FAILED_ID: i32 = -1;

/// A single Source RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Request id chosen by the client and echoed by the server.
    pub id: i32,
    /// Packet type (`SERVERDATA_*`).
    pub kind: i32,
    /// Body text, without the trailing NUL bytes.
    pub body: String,
}

impl Packet {
    /// Build an authentication packet.
    pub fn auth(id: i32, secret: impl Into<String>) -> Self {
        Self {
            id,
            kind: SERVERDATA_AUTH,
            body: secret.into(),
        }
    }

    /// Build a command execution packet.
    pub fn exec(id: i32, command: impl Into<String>) -> Self {
        Self {
            id,
            kind: SERVERDATA_EXECCOMMAND,
            body: command.into(),
        }
    }

    /// Build the empty response-value packet used as an end-of-output marker.
    ///
    /// Servers mirror it back after they have flushed all output of the
    /// previous command, which makes multi-packet responses detectable.
    pub fn terminator(id: i32) -> Self {
        Self {
            id,
            kind: SERVERDATA_RESPONSE_VALUE,
            body: String::new(),
        }
    }

    /// Value of the size field for this packet.
    pub fn wire_size(&self) -> usize {
        self.body.len() + MIN_PACKET_SIZE as usize
    }
}
