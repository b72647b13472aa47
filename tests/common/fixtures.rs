//! Fixture builders and the delivery harness.

use givecore::clock::FixedClock;
use givecore::confirm::Confirmer;
use givecore::model::{DbConnection, GrantRequest, ServerTarget, UserIdentity};
use givecore::store::{MemoryProvider, MemoryStore};
use givecore::{DeliveryContext, DeliveryReport, DeliveryResult, DriverRegistry};
use serde_json::json;
use std::sync::Arc;

use super::console::RecordingConsoles;

pub const NOW: i64 = 1_700_000_000;
pub const STEAM2: &str = "STEAM_1:1:22202";
pub const ACCOUNT_ID: i64 = 44405;

/// A user with a linked Steam account.
pub fn user() -> UserIdentity {
    let mut user = UserIdentity {
        id: 7,
        name: "alice".into(),
        login: "alice01".into(),
        email: Some("alice@example.com".into()),
        uri: "/profile/7".into(),
        ..Default::default()
    };
    user.socials.insert("Steam".into(), STEAM2.into());
    user
}

/// A Source server with an rcon secret and a VIP connection (sid 1).
pub fn server() -> ServerTarget {
    let mut server = ServerTarget {
        id: 1,
        name: "Public #1".into(),
        ip: "203.0.113.10".into(),
        port: 27015,
        rcon: Some("secret".into()),
        mod_id: 730,
        ..Default::default()
    };
    server.connections.insert("VIP".into(), connection("vip", Some(1)));
    server
}

/// A connection to `database`, optionally carrying a `sid`.
pub fn connection(database: &str, sid: Option<i64>) -> DbConnection {
    let mut conn = DbConnection {
        database: database.into(),
        ..Default::default()
    };
    if let Some(sid) = sid {
        conn.params.insert("sid".into(), json!(sid));
    }
    conn
}

/// Memory store + recording consoles + fixed clock + default registry.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub consoles: Arc<RecordingConsoles>,
    pub clock: Arc<FixedClock>,
    pub ctx: DeliveryContext,
    pub registry: DriverRegistry,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MemoryProvider::new)
    }

    /// Harness whose provider is customised (e.g. with table prefixes).
    pub fn with_provider(build: impl FnOnce(Arc<MemoryStore>) -> MemoryProvider) -> Self {
        let store = Arc::new(MemoryStore::new());
        let consoles = Arc::new(RecordingConsoles::new());
        let clock = Arc::new(FixedClock::new(NOW));
        let ctx = DeliveryContext::new(Arc::new(build(Arc::clone(&store))), consoles.clone())
            .with_clock(clock.clone());
        Self {
            store,
            consoles,
            clock,
            ctx,
            registry: DriverRegistry::with_defaults(),
        }
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.ctx = self.ctx.with_confirmer(confirmer);
        self
    }

    pub fn request(&self, driver: &str) -> GrantRequest {
        GrantRequest::new(driver, user(), server())
    }

    pub async fn deliver(&self, request: &GrantRequest) -> DeliveryResult<DeliveryReport> {
        self.registry.dispatch(&self.ctx, request).await
    }
}
