//! AdminSystem backend.
//!
//! Admins live in `{p}admins` keyed by the raw Steam id; what an admin may do
//! on a server lives in `{p}admins_servers`, one row per (admin, server).
//! Groups are referenced by id and must exist in `{p}groups`.

use async_trait::async_trait;
use tracing::info;

use super::{DeliveryContext, DeliveryReport, Driver, linked_steam};
use crate::confirm::Confirmation;
use crate::error::{DeliveryError, DeliveryResult};
use crate::grant::{ExistingGrant, reconcile, requested_duration};
use crate::model::GrantRequest;
use crate::params::{ParamSchema, ParamSpec, ValidatedParams};
use crate::store::{BackendTables, Cell, StoreError, row};

const CONNECTION: &str = "AdminSystem";
const DEFAULT_PREFIX: &str = "as_";

const SCHEMA: ParamSchema = ParamSchema::new(&[
    ParamSpec::required_int("group"),
    ParamSpec::int("time", Some(0)),
    ParamSpec::int("expires", None),
    ParamSpec::int("immunity", Some(0)),
    ParamSpec::text("flags", Some("")),
    ParamSpec::text("comment", Some("")),
    ParamSpec::int("sid", None),
]);

#[derive(Debug, Clone, Copy, Default)]
pub struct AdminSystemDriver;

impl AdminSystemDriver {
    /// Name of group `group_id`, or a configuration error when it does not exist.
    async fn group_name(tables: &BackendTables, group_id: i64) -> DeliveryResult<String> {
        let group = tables
            .find("groups", &["name"], &[("id", Cell::Int(group_id))])
            .await?
            .ok_or_else(|| DeliveryError::config("group not found"))?;
        Ok(group.get("name").and_then(Cell::as_text).unwrap_or_default())
    }

    /// Existing admin id, or the id of a freshly inserted admin.
    async fn admin_id(
        ctx: &DeliveryContext,
        tables: &BackendTables,
        request: &GrantRequest,
        params: &ValidatedParams,
        steam: &str,
        group_name: &str,
    ) -> DeliveryResult<i64> {
        let by_steam = [("steamid", Cell::from(steam))];

        if let Some(admin) = tables.find("admins", &["id", "name"], &by_steam).await? {
            ctx.confirm(
                request,
                Confirmation::UpdateAdmin {
                    name: admin.get("name").and_then(Cell::as_text).unwrap_or_default(),
                    group: group_name.to_string(),
                },
            )
            .await?;
            return admin
                .get("id")
                .and_then(Cell::as_i64)
                .ok_or_else(|| DeliveryError::Store(missing_id("admins")));
        }

        let inserted = tables
            .insert(
                "admins",
                &row([
                    ("name", Cell::from(request.user.name.as_str())),
                    ("steamid", Cell::from(steam)),
                    ("comment", Cell::from(params.text("comment").unwrap_or(""))),
                ]),
            )
            .await?;
        match inserted {
            Some(id) => Ok(id),
            None => tables
                .find("admins", &["id"], &by_steam)
                .await?
                .and_then(|admin| admin.get("id").and_then(Cell::as_i64))
                .ok_or_else(|| DeliveryError::Store(missing_id("admins"))),
        }
    }
}

fn missing_id(table: &str) -> StoreError {
    StoreError::Internal(format!("no id returned for {table} row"))
}

#[async_trait]
impl Driver for AdminSystemDriver {
    fn alias(&self) -> &str {
        "adminsystem"
    }

    fn schema(&self) -> ParamSchema {
        SCHEMA
    }

    async fn deliver(
        &self,
        ctx: &DeliveryContext,
        request: &GrantRequest,
        params: &ValidatedParams,
    ) -> DeliveryResult<DeliveryReport> {
        let (tables, _) = ctx
            .backend(&request.server, CONNECTION, DEFAULT_PREFIX)
            .await?;
        let server_id = params.int("sid").unwrap_or(request.server.id);
        let group_id = params.require_int("group")?;
        let duration = requested_duration(params, request.time_override)?;
        let steam = linked_steam(request)?;

        let group_name = Self::group_name(&tables, group_id).await?;
        let admin_id = Self::admin_id(ctx, &tables, request, params, steam, &group_name).await?;

        let key = [
            ("admin_id", Cell::Int(admin_id)),
            ("server_id", Cell::Int(server_id)),
        ];
        let existing = tables
            .find("admins_servers", &["group_id", "expires"], &key)
            .await?
            .map(|r| ExistingGrant::from_row(&r, "group_id", "expires"));

        let mut reconciled = reconcile(
            existing.as_ref(),
            &group_id.to_string(),
            duration,
            ctx.clock.now(),
        );
        if let Some(expires) = params.int("expires") {
            reconciled.expires = expires;
        }

        tables
            .upsert(
                "admins_servers",
                &key,
                &row([
                    ("group_id", Cell::Int(group_id)),
                    ("immunity", Cell::Int(params.int("immunity").unwrap_or(0))),
                    ("expires", Cell::Int(reconciled.expires)),
                    ("flags", Cell::from(params.text("flags").unwrap_or(""))),
                ]),
                &row([]),
            )
            .await?;

        info!(
            alias = "adminsystem",
            server = %request.server.name,
            admin_id,
            group = %group_name,
            expires = reconciled.expires,
            "Admin assignment written"
        );

        Ok(DeliveryReport {
            change: Some(reconciled.change),
            expires: Some(reconciled.expires),
            ..Default::default()
        })
    }
}
