//! Driver for single-table grant backends.

use async_trait::async_trait;
use tracing::info;

use super::profile::{BackendProfile, IdentityForm, InsertValue, ScopeSource};
use super::{DeliveryContext, DeliveryReport, Driver, steam_identity};
use crate::confirm::Confirmation;
use crate::error::{DeliveryError, DeliveryResult};
use crate::grant::{ExistingGrant, reconcile, requested_duration};
use crate::identity::NormalizedIdentity;
use crate::model::{DbConnection, GrantRequest};
use crate::params::{ParamSchema, ParamValue, ValidatedParams};
use crate::store::{BackendTables, Cell, Row};

/// Writes grants into the table a [`BackendProfile`] describes.
#[derive(Debug, Clone, Copy)]
pub struct GrantTableDriver {
    profile: BackendProfile,
}

impl GrantTableDriver {
    pub const fn new(profile: BackendProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    async fn scope(
        &self,
        tables: &BackendTables,
        conn: &DbConnection,
        request: &GrantRequest,
        params: &ValidatedParams,
    ) -> DeliveryResult<Cell> {
        match self.profile.scope {
            ScopeSource::ConnectionSid => params
                .int("sid")
                .or_else(|| conn.param_int("sid"))
                .filter(|sid| *sid != 0)
                .map(Cell::Int)
                .ok_or_else(|| {
                    DeliveryError::config(format!(
                        "SID {} for db connection is empty",
                        request.server.name
                    ))
                }),
            ScopeSource::ServerLookup {
                table,
                ip_column,
                port_column,
                id_column,
            } => {
                let filters = [
                    (ip_column, Cell::from(request.server.ip.as_str())),
                    (port_column, Cell::from(request.server.port)),
                ];
                tables
                    .find(table, &[id_column], &filters)
                    .await?
                    .and_then(|row| row.get(id_column).cloned())
                    .filter(|id| *id != Cell::Null)
                    .ok_or_else(|| DeliveryError::config("server not found"))
            }
        }
    }

    fn identity_key(&self, identity: &NormalizedIdentity) -> Cell {
        match self.profile.identity_form {
            IdentityForm::AccountId if identity.reliable => identity
                .account_id
                .parse::<i64>()
                .map(Cell::Int)
                .unwrap_or_else(|_| Cell::from(identity.account_id.as_str())),
            IdentityForm::AccountId => Cell::from(identity.account_id.as_str()),
            IdentityForm::Raw => Cell::from(identity.raw.as_str()),
        }
    }

    fn insert_extra(&self, request: &GrantRequest, now: i64) -> Row {
        self.profile
            .insert_extra
            .iter()
            .map(|(column, value)| {
                let cell = match value {
                    InsertValue::Now => Cell::Int(now),
                    InsertValue::DisplayName => Cell::from(request.user.name.as_str()),
                    InsertValue::Text(t) => Cell::from(*t),
                    InsertValue::Int(i) => Cell::Int(*i),
                };
                (column.to_string(), cell)
            })
            .collect()
    }
}

#[async_trait]
impl Driver for GrantTableDriver {
    fn alias(&self) -> &str {
        self.profile.alias
    }

    fn schema(&self) -> ParamSchema {
        self.profile.schema
    }

    async fn deliver(
        &self,
        ctx: &DeliveryContext,
        request: &GrantRequest,
        params: &ValidatedParams,
    ) -> DeliveryResult<DeliveryReport> {
        let p = &self.profile;
        let (tables, conn) = ctx
            .backend(&request.server, p.connection, p.default_prefix)
            .await?;
        let scope = self.scope(&tables, conn, request, params).await?;

        let (group, group_cell) = match params.get(p.group_param) {
            Some(ParamValue::Text(t)) => (t.clone(), Cell::from(t.as_str())),
            Some(ParamValue::Int(i)) => (i.to_string(), Cell::Int(*i)),
            None => return Err(DeliveryError::config(format!("{} is required", p.group_param))),
        };
        let duration = requested_duration(params, request.time_override)?;

        let identity = steam_identity(request)?;
        let key = [
            (p.identity_column, self.identity_key(&identity)),
            (p.scope_column, scope),
        ];

        let existing = tables
            .find(p.table, &[p.group_column, p.expires_column], &key)
            .await?
            .map(|row| ExistingGrant::from_row(&row, p.group_column, p.expires_column));

        if let Some(existing) = &existing {
            let prompt = if existing.group == group {
                Confirmation::AddTime {
                    server: request.server.name.clone(),
                }
            } else {
                Confirmation::ReplaceGroup {
                    current: existing.group.clone(),
                    requested: group.clone(),
                }
            };
            ctx.confirm(request, prompt).await?;
        }

        let now = ctx.clock.now();
        let reconciled = reconcile(existing.as_ref(), &group, duration, now);
        let values = Row::from([
            (p.group_column.to_string(), group_cell),
            (p.expires_column.to_string(), Cell::Int(reconciled.expires)),
        ]);

        if existing.is_some() {
            tables.update(p.table, &values, &key).await?;
        } else {
            let mut row = self.insert_extra(request, now);
            row.extend(values);
            row.extend(key.iter().map(|(k, v)| (k.to_string(), v.clone())));
            tables.insert(p.table, &row).await?;
        }
        info!(
            alias = p.alias,
            server = %request.server.name,
            group = %group,
            expires = reconciled.expires,
            change = reconciled.change.as_str(),
            "Grant delivered"
        );

        let notified = ctx.notify(&request.server, p.reload_command).await;
        Ok(DeliveryReport {
            change: Some(reconciled.change),
            expires: Some(reconciled.expires),
            notified,
            ..Default::default()
        })
    }
}
