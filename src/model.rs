//! Request-side data model: who receives a grant, where, and with which parameters.

use std::collections::BTreeMap;

use rcon_proto::Dialect;
use serde::Deserialize;
use serde_json::Value;

/// Free-form, string-keyed parameter bag supplied with a request.
pub type Params = serde_json::Map<String, Value>;

/// Social network keys that may hold the user's Steam identity, in lookup order.
pub const STEAM_NETWORKS: [&str; 2] = ["Steam", "HttpsSteam"];

/// A user and the platform accounts linked to them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserIdentity {
    /// Local user id.
    #[serde(default)]
    pub id: i64,
    /// Display name written into backend rows.
    pub name: String,
    /// Login name.
    #[serde(default)]
    pub login: String,
    /// Email address, if known.
    #[serde(default)]
    pub email: Option<String>,
    /// Public profile URI.
    #[serde(default)]
    pub uri: String,
    /// Linked accounts: network name -> identifier.
    #[serde(default)]
    pub socials: BTreeMap<String, String>,
}

impl UserIdentity {
    /// Identifier linked for `network`, ignoring empty values.
    pub fn social(&self, network: &str) -> Option<&str> {
        self.socials
            .get(network)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// The linked Steam identifier, if any.
    pub fn steam(&self) -> Option<&str> {
        STEAM_NETWORKS.iter().find_map(|n| self.social(n))
    }
}

/// A named external database connection attached to a server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbConnection {
    /// Name of the database entry in `[databases]`.
    pub database: String,
    /// Backend-specific extra settings (e.g. `sid`).
    #[serde(flatten)]
    pub params: Params,
}

impl DbConnection {
    /// Integer setting, accepting numbers or numeric strings.
    pub fn param_int(&self, key: &str) -> Option<i64> {
        match self.params.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// The game server a grant is delivered to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerTarget {
    /// Numeric server id.
    #[serde(default)]
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Host name or address.
    pub ip: String,
    /// Game/rcon port.
    pub port: u16,
    /// Remote console shared secret.
    #[serde(default)]
    pub rcon: Option<String>,
    /// Engine/mod discriminator, selects the rcon dialect.
    #[serde(default, rename = "mod")]
    pub mod_id: i64,
    /// Named backend connections ("VIP", "AdminSystem", ...).
    #[serde(default)]
    pub connections: BTreeMap<String, DbConnection>,
}

impl ServerTarget {
    /// Connection registered under `name`.
    pub fn connection(&self, name: &str) -> Option<&DbConnection> {
        self.connections.get(name)
    }

    /// The rcon secret, when one is configured and non-empty.
    pub fn rcon_secret(&self) -> Option<&str> {
        self.rcon.as_deref().filter(|s| !s.is_empty())
    }

    /// Protocol dialect for this server's engine.
    pub fn dialect(&self) -> Dialect {
        Dialect::from_mod(self.mod_id)
    }
}

/// One delivery invocation.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    /// Driver alias to dispatch to.
    pub driver: String,
    /// Recipient.
    pub user: UserIdentity,
    /// Target server.
    pub server: ServerTarget,
    /// Driver parameters.
    pub params: Params,
    /// Pre-resolved duration in seconds; wins over the `time` parameter.
    pub time_override: Option<u64>,
    /// Skip the confirmation gate before overwriting an existing grant.
    pub skip_confirmation: bool,
}

impl GrantRequest {
    /// Create a request with no parameters.
    pub fn new(driver: impl Into<String>, user: UserIdentity, server: ServerTarget) -> Self {
        Self {
            driver: driver.into(),
            user,
            server,
            params: Params::new(),
            time_override: None,
            skip_confirmation: false,
        }
    }

    /// Set one parameter.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}
