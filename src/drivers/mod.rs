//! Delivery drivers.
//!
//! A driver turns a validated [`GrantRequest`] into persisted state on one
//! backend and, when the server has a console secret, a live reload.
//!
//! - [`grant_table`]: single-table VIP/admin backends described by a [`BackendProfile`]
//! - [`admin_system`]: AdminSystem admins with per-server group assignments
//! - [`sourcebans`]: SourceBans admins
//! - [`rcon`]: free-text console commands, no store

pub mod admin_system;
pub mod grant_table;
pub mod profile;
pub mod rcon;
pub mod sourcebans;

pub use admin_system::AdminSystemDriver;
pub use grant_table::GrantTableDriver;
pub use profile::{BackendProfile, IdentityForm, InsertValue, ScopeSource};
pub use rcon::RconDriver;
pub use sourcebans::SourceBansDriver;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::{Clock, SystemClock};
use crate::config::{CommandFailurePolicy, ConfirmationMode, DeliveryConfig};
use crate::confirm::{AutoAccept, Confirmation, Confirmer, DeclineAll, TerminalConfirmer};
use crate::error::{DeliveryError, DeliveryResult};
use crate::grant::GrantChange;
use crate::identity::NormalizedIdentity;
use crate::model::{DbConnection, GrantRequest, ServerTarget};
use crate::notify::{ConsoleFactory, notify_reload};
use crate::params::{ParamSchema, ValidatedParams};
use crate::store::{BackendTables, StoreProvider};

/// A pluggable delivery strategy.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Name the driver registers under by default.
    fn alias(&self) -> &str;

    /// Parameters this driver reads.
    fn schema(&self) -> ParamSchema;

    /// Deliver the grant. `params` has already been validated against [`Driver::schema`].
    async fn deliver(
        &self,
        ctx: &DeliveryContext,
        request: &GrantRequest,
        params: &ValidatedParams,
    ) -> DeliveryResult<DeliveryReport>;
}

/// Outcome of a successful delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// How the stored grant changed; `None` for drivers that store nothing.
    pub change: Option<GrantChange>,
    /// Stored expiry, 0 = permanent.
    pub expires: Option<i64>,
    /// Whether the reload command reached the server.
    pub notified: bool,
    /// Console commands executed.
    pub commands_sent: usize,
    /// Console commands that failed and were skipped.
    pub commands_skipped: Vec<String>,
}

/// Collaborators shared by every delivery.
#[derive(Clone)]
pub struct DeliveryContext {
    pub stores: Arc<dyn StoreProvider>,
    pub consoles: Arc<dyn ConsoleFactory>,
    pub confirmer: Arc<dyn Confirmer>,
    pub clock: Arc<dyn Clock>,
    pub connect_timeout: Duration,
    pub command_failure_policy: CommandFailurePolicy,
}

impl DeliveryContext {
    pub fn new(stores: Arc<dyn StoreProvider>, consoles: Arc<dyn ConsoleFactory>) -> Self {
        let defaults = DeliveryConfig::default();
        Self {
            stores,
            consoles,
            confirmer: Arc::new(AutoAccept),
            clock: Arc::new(SystemClock),
            connect_timeout: defaults.connect_timeout(),
            command_failure_policy: defaults.command_failure_policy,
        }
    }

    /// Context configured from the `[delivery]` section.
    pub fn from_config(
        config: &DeliveryConfig,
        stores: Arc<dyn StoreProvider>,
        consoles: Arc<dyn ConsoleFactory>,
    ) -> Self {
        let confirmer: Arc<dyn Confirmer> = match config.confirmation {
            ConfirmationMode::Auto => Arc::new(AutoAccept),
            ConfirmationMode::Prompt => Arc::new(TerminalConfirmer),
            ConfirmationMode::Decline => Arc::new(DeclineAll),
        };
        Self {
            confirmer,
            connect_timeout: config.connect_timeout(),
            command_failure_policy: config.command_failure_policy,
            ..Self::new(stores, consoles)
        }
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_failure_policy(mut self, policy: CommandFailurePolicy) -> Self {
        self.command_failure_policy = policy;
        self
    }

    /// Run the confirmation gate unless the request opted out.
    pub(crate) async fn confirm(
        &self,
        request: &GrantRequest,
        prompt: Confirmation,
    ) -> DeliveryResult<()> {
        if request.skip_confirmation {
            return Ok(());
        }
        self.confirmer.confirm(&prompt).await
    }

    /// Open the backend behind `connection`, with its prefix resolved.
    pub(crate) async fn backend<'s>(
        &self,
        server: &'s ServerTarget,
        connection: &str,
        default_prefix: &str,
    ) -> DeliveryResult<(BackendTables, &'s DbConnection)> {
        let conn = required_connection(server, connection)?;
        let prefix = self
            .stores
            .prefix(&conn.database)
            .unwrap_or_else(|| default_prefix.to_string());
        let store = self.stores.open(&conn.database).await?;
        Ok((BackendTables::new(store, prefix), conn))
    }

    /// Best-effort reload; see [`notify_reload`].
    pub(crate) async fn notify(&self, server: &ServerTarget, command: &str) -> bool {
        notify_reload(self.consoles.as_ref(), server, self.connect_timeout, command).await
    }
}

/// The named connection, or a configuration error.
pub(crate) fn required_connection<'s>(
    server: &'s ServerTarget,
    name: &str,
) -> DeliveryResult<&'s DbConnection> {
    server
        .connection(name)
        .ok_or_else(|| DeliveryError::config(format!("db connection {name} does not exist")))
}

/// The user's linked Steam identity as stored on their profile.
pub(crate) fn linked_steam(request: &GrantRequest) -> DeliveryResult<&str> {
    request
        .user
        .steam()
        .ok_or_else(|| DeliveryError::IdentityMissing("Steam".to_string()))
}

/// The user's linked Steam identity, normalized.
pub(crate) fn steam_identity(request: &GrantRequest) -> DeliveryResult<NormalizedIdentity> {
    linked_steam(request).map(NormalizedIdentity::resolve)
}
