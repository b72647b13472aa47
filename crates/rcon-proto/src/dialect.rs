//! Protocol dialect selection.

use std::fmt;

/// Engine discriminator identifying GoldSource (Half-Life 1) based servers.
pub const GOLDSOURCE_MOD: i64 = 10;

/// Remote console dialect spoken by a game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Legacy GoldSource rcon: connectionless UDP datagrams with a challenge.
    GoldSource,
    /// Source rcon: length-prefixed packets over TCP with a login exchange.
    Source,
}

impl Dialect {
    /// Select the dialect from a server's engine/mod discriminator.
    pub fn from_mod(mod_id: i64) -> Self {
        if mod_id == GOLDSOURCE_MOD {
            Self::GoldSource
        } else {
            Self::Source
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoldSource => f.write_str("goldsource"),
            Self::Source => f.write_str("source"),
        }
    }
}
