//! givecore - privilege grant delivery for game servers.
//!
//! Grants time-boxed or permanent privileges (VIP status, admin rights,
//! arbitrary console commands) to a user on a game server: the grant is
//! reconciled into one of several independently-schemed admin databases, then
//! the live server is told to reload over its remote console.
//!
//! ```text
//! DriverRegistry::dispatch
//!   -> ParamSchema::validate
//!   -> Driver::deliver
//!        connection -> prefix -> identity -> read -> reconcile -> upsert
//!   -> notify (best effort)
//! ```

pub mod clock;
pub mod config;
pub mod confirm;
pub mod drivers;
pub mod error;
pub mod grant;
pub mod identity;
pub mod model;
pub mod notify;
pub mod params;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use drivers::{DeliveryContext, DeliveryReport, Driver};
pub use error::{DeliveryError, DeliveryResult};
pub use model::{GrantRequest, ServerTarget, UserIdentity};
pub use registry::DriverRegistry;
