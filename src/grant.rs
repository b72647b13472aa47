//! Grant reconciliation: merges a requested grant with the stored one.
//!
//! | Existing record | Duration `d > 0` | Duration `0` |
//! |-----------------|------------------|--------------|
//! | none | `now + d` | `0` (permanent) |
//! | same group | `existing.expires + d` | `0` |
//! | other group | `now + d` | `0` |
//!
//! Same-group extension adds to the stored expiry, not to `now`, so repeated
//! grants accumulate.

use crate::error::DeliveryError;
use crate::params::ValidatedParams;
use crate::store::{Cell, Row};

/// The part of a stored record reconciliation looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingGrant {
    pub group: String,
    pub expires: i64,
}

impl ExistingGrant {
    /// Read `group_col`/`expires_col` from a stored row. A NULL expiry reads as 0.
    pub fn from_row(row: &Row, group_col: &str, expires_col: &str) -> Self {
        Self {
            group: row
                .get(group_col)
                .and_then(Cell::as_text)
                .unwrap_or_default(),
            expires: row.get(expires_col).and_then(Cell::as_i64).unwrap_or(0),
        }
    }
}

/// How the stored record changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantChange {
    Created,
    Extended,
    Replaced,
}

impl GrantChange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Extended => "extended",
            Self::Replaced => "replaced",
        }
    }
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// Absolute expiry, 0 = permanent.
    pub expires: i64,
    pub change: GrantChange,
}

/// Compute the new expiry for `group` with `duration` seconds at `now`.
pub fn reconcile(
    existing: Option<&ExistingGrant>,
    group: &str,
    duration: u64,
    now: i64,
) -> Reconciled {
    let d = i64::try_from(duration).unwrap_or(i64::MAX);
    let (base, change) = match existing {
        None => (now, GrantChange::Created),
        Some(e) if e.group == group => (e.expires, GrantChange::Extended),
        Some(_) => (now, GrantChange::Replaced),
    };
    let expires = if d == 0 { 0 } else { base.saturating_add(d) };
    Reconciled { expires, change }
}

/// Requested duration: the pre-resolved override wins over the `time` parameter.
pub fn requested_duration(
    params: &ValidatedParams,
    time_override: Option<u64>,
) -> Result<u64, DeliveryError> {
    if let Some(seconds) = time_override {
        return Ok(seconds);
    }
    let time = params.int("time").unwrap_or(0);
    u64::try_from(time)
        .map_err(|_| DeliveryError::config(format!("time must not be negative, got {time}")))
}
