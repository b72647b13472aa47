//! SourceBans backend.
//!
//! Admins are keyed by the Steam2 rendering in `authid`. Web panel logins
//! verify bcrypt hashes, so new admins get a hashed password (generated when
//! the request carries none).

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use super::{DeliveryContext, DeliveryReport, Driver, steam_identity};
use crate::confirm::Confirmation;
use crate::error::{DeliveryError, DeliveryResult};
use crate::grant::GrantChange;
use crate::model::{GrantRequest, ServerTarget};
use crate::params::{ParamSchema, ParamSpec, ValidatedParams};
use crate::store::{BackendTables, Cell, StoreError, row};

const CONNECTION: &str = "SourceBans";
const DEFAULT_PREFIX: &str = "sb_";
const RELOAD_COMMAND: &str = "sm_reloadadmins";

const PASSWORD_LENGTH: usize = 12;
const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+";

const SCHEMA: ParamSchema = ParamSchema::new(&[
    ParamSpec::required_text("group"),
    ParamSpec::int("immunity", Some(0)),
    ParamSpec::text("password", None),
]);

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceBansDriver;

/// Random password drawn from [`PASSWORD_ALPHABET`].
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .map(|_| char::from(PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())]))
        .collect()
}

/// bcrypt hash of `password`, computed off the async workers.
async fn hash_password(password: String) -> DeliveryResult<String> {
    let internal = |msg: String| DeliveryError::Store(StoreError::Internal(msg));
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| internal(format!("password hashing failed: {e}")))
}

/// SourceBans id of the target server, 0 when it is not registered.
async fn server_id(tables: &BackendTables, server: &ServerTarget) -> DeliveryResult<i64> {
    if server.ip.is_empty() || server.port == 0 {
        return Ok(0);
    }
    let found = tables
        .find(
            "servers",
            &["sid"],
            &[
                ("ip", Cell::from(server.ip.as_str())),
                ("port", Cell::from(server.port)),
            ],
        )
        .await?;
    Ok(found
        .and_then(|r| r.get("sid").and_then(Cell::as_i64))
        .unwrap_or(0))
}

#[async_trait]
impl Driver for SourceBansDriver {
    fn alias(&self) -> &str {
        "sourcebans"
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
        let group = params.require_text("group")?;
        let immunity = params.int("immunity").unwrap_or(0);
        let auth_id = steam_identity(request)?.steam2;
        let by_auth = [("authid", Cell::from(auth_id.as_str()))];
        let server_id = server_id(&tables, &request.server).await?;

        let existing = tables.find("admins", &["aid", "user"], &by_auth).await?;
        let (admin_id, change) = match existing {
            Some(admin) => {
                let aid = admin
                    .get("aid")
                    .cloned()
                    .ok_or_else(|| StoreError::Internal("admin row without aid".into()))?;
                ctx.confirm(
                    request,
                    Confirmation::UpdateAdmin {
                        name: admin.get("user").and_then(Cell::as_text).unwrap_or_default(),
                        group: group.to_string(),
                    },
                )
                .await?;
                tables
                    .update(
                        "admins",
                        &row([
                            ("srv_group", Cell::from(group)),
                            ("immunity", Cell::Int(immunity)),
                        ]),
                        &[("aid", aid.clone())],
                    )
                    .await?;
                (aid, GrantChange::Replaced)
            }
            None => {
                let password = match params.text("password").filter(|p| !p.is_empty()) {
                    Some(p) => p.to_string(),
                    None => generate_password(),
                };
                let hashed = hash_password(password).await?;
                let inserted = tables
                    .insert(
                        "admins",
                        &row([
                            ("user", Cell::from(request.user.name.as_str())),
                            ("authid", Cell::from(auth_id.as_str())),
                            ("password", Cell::from(hashed)),
                            ("gid", Cell::Int(0)),
                            ("email", Cell::from(request.user.email.clone().unwrap_or_default())),
                            ("srv_group", Cell::from(group)),
                            ("immunity", Cell::Int(immunity)),
                            ("lastvisit", Cell::Int(ctx.clock.now())),
                        ]),
                    )
                    .await?;
                let aid = match inserted {
                    Some(id) => Cell::Int(id),
                    None => newest_aid(&tables, &by_auth).await?,
                };
                (aid, GrantChange::Created)
            }
        };

        let assignment = [
            ("admin_id", admin_id.clone()),
            ("server_id", Cell::Int(server_id)),
        ];
        if tables
            .find("admins_servers_groups", &["admin_id"], &assignment)
            .await?
            .is_none()
        {
            let mut values = row([
                ("group_id", Cell::Int(-1)),
                ("srv_group_id", Cell::Int(-1)),
            ]);
            values.extend(assignment.iter().map(|(k, v)| (k.to_string(), v.clone())));
            tables.insert("admins_servers_groups", &values).await?;
        }

        info!(
            alias = "sourcebans",
            server = %request.server.name,
            admin_id = %admin_id,
            group = %group,
            change = change.as_str(),
            "SourceBans admin written"
        );

        let notified = ctx.notify(&request.server, RELOAD_COMMAND).await;
        Ok(DeliveryReport {
            change: Some(change),
            notified,
            ..Default::default()
        })
    }
}

/// Highest `aid` among rows matching `filters`.
async fn newest_aid(tables: &BackendTables, filters: &[(&str, Cell)]) -> DeliveryResult<Cell> {
    tables
        .select("admins", &["aid"], filters)
        .await?
        .iter()
        .filter_map(|r| r.get("aid").and_then(Cell::as_i64))
        .max()
        .map(Cell::Int)
        .ok_or_else(|| StoreError::Internal("failed to get admin id after creation".into()).into())
}
