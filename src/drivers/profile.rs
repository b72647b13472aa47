//! Per-backend layout of single-table grant stores.
//!
//! Adding a backend whose grants live in one table keyed by
//! (identity, scope) is adding a [`BackendProfile`] value.

use crate::params::{ParamSchema, ParamSpec};

/// How the identity column is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityForm {
    /// Numeric 32-bit account id.
    AccountId,
    /// The platform identity exactly as linked.
    Raw,
}

/// Where the scope value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSource {
    /// The connection's `sid` setting; a `sid` request parameter overrides it.
    ConnectionSid,
    /// A row of `table` whose address columns match the target server.
    ServerLookup {
        table: &'static str,
        ip_column: &'static str,
        port_column: &'static str,
        id_column: &'static str,
    },
}

/// Value written into an extra column on insert only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertValue {
    /// Current unix time.
    Now,
    /// The user's display name.
    DisplayName,
    Text(&'static str),
    Int(i64),
}

/// Table and column layout of one backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendProfile {
    pub alias: &'static str,
    /// Named connection on the server target.
    pub connection: &'static str,
    /// Prefix used when the database declares none.
    pub default_prefix: &'static str,
    pub table: &'static str,
    pub identity_column: &'static str,
    pub identity_form: IdentityForm,
    pub scope_column: &'static str,
    pub scope: ScopeSource,
    /// Request parameter holding the group.
    pub group_param: &'static str,
    pub group_column: &'static str,
    pub expires_column: &'static str,
    pub insert_extra: &'static [(&'static str, InsertValue)],
    /// Console command that makes the server re-read the table.
    pub reload_command: &'static str,
    pub schema: ParamSchema,
}

/// VIP plugin: `users` keyed by account id and the deployment `sid`.
pub const VIP: BackendProfile = BackendProfile {
    alias: "vip",
    connection: "VIP",
    default_prefix: "",
    table: "users",
    identity_column: "account_id",
    identity_form: IdentityForm::AccountId,
    scope_column: "sid",
    scope: ScopeSource::ConnectionSid,
    group_param: "group",
    group_column: "group",
    expires_column: "expires",
    insert_extra: &[
        ("lastvisit", InsertValue::Now),
        ("name", InsertValue::DisplayName),
    ],
    reload_command: "vip_reload",
    schema: ParamSchema::new(&[
        ParamSpec::required_text("group"),
        ParamSpec::int("time", Some(0)),
        ParamSpec::int("sid", None),
    ]),
};

/// Fabius VIP: same row layout, server resolved from `servers` by address.
pub const FABIUS: BackendProfile = BackendProfile {
    alias: "fabius",
    connection: "FabiusVIP",
    default_prefix: "vip_",
    scope: ScopeSource::ServerLookup {
        table: "servers",
        ip_column: "serverIp",
        port_column: "port",
        id_column: "serverId",
    },
    schema: ParamSchema::new(&[
        ParamSpec::required_text("group"),
        ParamSpec::int("time", Some(0)),
    ]),
    ..VIP
};

/// IKS Admin: `admins` keyed by the raw Steam id and `server_id`.
pub const IKS_ADMIN: BackendProfile = BackendProfile {
    alias: "iksAdmin",
    connection: "IKSAdmin",
    default_prefix: "",
    table: "admins",
    identity_column: "sid",
    identity_form: IdentityForm::Raw,
    scope_column: "server_id",
    scope: ScopeSource::ConnectionSid,
    group_param: "group_id",
    group_column: "group_id",
    expires_column: "end",
    insert_extra: &[
        ("flags", InsertValue::Text("")),
        ("immunity", InsertValue::Int(-1)),
        ("name", InsertValue::DisplayName),
    ],
    reload_command: "css_reload_admins",
    schema: ParamSchema::new(&[
        ParamSpec::required_int("group_id"),
        ParamSpec::int("time", Some(0)),
        ParamSpec::int("sid", None),
    ]),
};
