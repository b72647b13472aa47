//! Driver registry and dispatch.
//!
//! The registry maps aliases to drivers. It holds no grant state: dispatch
//! validates the request's parameters against the driver's schema and hands
//! the request over, returning the driver's result unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Instrument, debug, error, info};

use crate::drivers::profile::{FABIUS, IKS_ADMIN, VIP};
use crate::drivers::{
    AdminSystemDriver, DeliveryContext, DeliveryReport, Driver, GrantTableDriver, RconDriver,
    SourceBansDriver,
};
use crate::error::{DeliveryError, DeliveryResult};
use crate::model::GrantRequest;
use crate::telemetry::{DeliveryTimer, spans};

/// Registry of delivery drivers.
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in driver under its own alias.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Single-table grant backends
        registry.register_driver(GrantTableDriver::new(VIP));
        registry.register_driver(GrantTableDriver::new(FABIUS));
        registry.register_driver(GrantTableDriver::new(IKS_ADMIN));

        // Admin panels
        registry.register_driver(AdminSystemDriver);
        registry.register_driver(SourceBansDriver);

        // Console commands
        registry.register_driver(RconDriver);

        registry
    }

    /// Register `driver` under `alias`, replacing any previous mapping.
    pub fn register(&mut self, alias: impl Into<String>, driver: Arc<dyn Driver>) {
        let alias = alias.into();
        if self.drivers.insert(alias.clone(), driver).is_some() {
            debug!(alias = %alias, "driver replaced");
        }
    }

    /// Register `driver` under its own [`Driver::alias`].
    pub fn register_driver<D: Driver + 'static>(&mut self, driver: D) {
        let alias = driver.alias().to_string();
        self.register(alias, Arc::new(driver));
    }

    /// Remove the mapping for `alias`; no-op when absent.
    pub fn unregister(&mut self, alias: &str) {
        self.drivers.remove(alias);
    }

    pub fn exists(&self, alias: &str) -> bool {
        self.drivers.contains_key(alias)
    }

    pub fn get(&self, alias: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(alias).cloned()
    }

    /// Registered aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Deliver `request` with the driver registered under `request.driver`.
    pub async fn dispatch(
        &self,
        ctx: &DeliveryContext,
        request: &GrantRequest,
    ) -> DeliveryResult<DeliveryReport> {
        let alias = request.driver.as_str();
        let Some(driver) = self.drivers.get(alias) else {
            error!(alias = %alias, "unknown driver");
            return Err(DeliveryError::UnknownDriver(alias.to_string()));
        };

        let span = spans::delivery(alias, &request.server.name);
        let _timer = DeliveryTimer::new(alias);

        let result = async {
            let params = driver.schema().validate(&request.params)?;
            driver.deliver(ctx, request, &params).await
        }
        .instrument(span)
        .await;

        match &result {
            Ok(report) => info!(
                alias = %alias,
                server = %request.server.name,
                notified = report.notified,
                "Delivery succeeded"
            ),
            Err(e) => error!(
                alias = %alias,
                server = %request.server.name,
                error = %e,
                code = e.error_code(),
                "Delivery failed"
            ),
        }
        result
    }
}
