//! Integration tests for the SQL grant store over SQLite.

mod common;

use common::{ACCOUNT_ID, NOW, connection, server, user};
use givecore::clock::FixedClock;
use givecore::config::DatabaseConfig;
use givecore::store::{Cell, GrantStore, SqlStore, SqlStoreProvider, StoreError, row};
use givecore::{DeliveryContext, DriverRegistry, GrantRequest};
use std::collections::HashMap;
use std::sync::Arc;

const USERS: &str = "CREATE TABLE users (
    account_id INTEGER NOT NULL,
    sid INTEGER NOT NULL,
    `group` TEXT NOT NULL,
    expires INTEGER NOT NULL,
    lastvisit INTEGER,
    name TEXT
)";

async fn memory_store() -> SqlStore {
    let store = SqlStore::connect("sqlite::memory:", 1).await.unwrap();
    sqlx::query(USERS).execute(store.pool()).await.unwrap();
    store
}

#[tokio::test]
async fn test_insert_select_update() {
    let store = memory_store().await;

    store
        .insert(
            "users",
            &row([
                ("account_id", Cell::Int(ACCOUNT_ID)),
                ("sid", Cell::Int(1)),
                ("group", Cell::from("gold")),
                ("expires", Cell::Int(NOW)),
                ("name", Cell::Null),
            ]),
        )
        .await
        .unwrap();

    let rows = store
        .select(
            "users",
            &["group", "expires", "name"],
            &[("account_id", Cell::Int(ACCOUNT_ID)), ("sid", Cell::Int(1))],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["group"], Cell::from("gold"));
    assert_eq!(rows[0]["expires"], Cell::Int(NOW));
    assert_eq!(rows[0]["name"], Cell::Null);
    assert!(!rows[0].contains_key("account_id"));

    let affected = store
        .update(
            "users",
            &row([("group", Cell::from("silver"))]),
            &[("account_id", Cell::Int(ACCOUNT_ID))],
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let none = store
        .select("users", &["sid"], &[("sid", Cell::Int(2))])
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_rejects_unsafe_identifiers() {
    let store = memory_store().await;
    let err = store
        .select("users; DROP TABLE users", &["sid"], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));

    let err = store.select("users", &["*"], &[]).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    assert!(store.select("users", &[], &[]).await.is_err());
}

#[tokio::test]
async fn test_vip_delivery_through_provider() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("vip.db").display());

    let setup = SqlStore::connect(&url, 1).await.unwrap();
    sqlx::query(USERS).execute(setup.pool()).await.unwrap();

    let databases = HashMap::from([(
        "vip".to_string(),
        DatabaseConfig {
            url,
            prefix: None,
            max_connections: 1,
        },
    )]);
    let ctx = DeliveryContext::new(
        Arc::new(SqlStoreProvider::new(databases)),
        Arc::new(common::RecordingConsoles::new()),
    )
    .with_clock(Arc::new(FixedClock::new(NOW)));
    let registry = DriverRegistry::with_defaults();

    let mut target = server();
    target.rcon = None;
    target.connections.insert("VIP".into(), connection("vip", Some(1)));
    let request = GrantRequest::new("vip", user(), target)
        .param("group", "gold")
        .param("time", 3600);

    registry.dispatch(&ctx, &request).await.unwrap();
    registry.dispatch(&ctx, &request).await.unwrap();

    let rows = setup
        .select("users", &["account_id", "expires", "lastvisit", "name"], &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["account_id"], Cell::Int(ACCOUNT_ID));
    assert_eq!(rows[0]["expires"], Cell::Int(NOW + 7200));
    assert_eq!(rows[0]["lastvisit"], Cell::Int(NOW));
    assert_eq!(rows[0]["name"], Cell::from("alice"));
}

const SB_SERVERS: &str = "CREATE TABLE sb_servers (
    sid INTEGER PRIMARY KEY,
    ip TEXT NOT NULL,
    port INTEGER NOT NULL,
    enabled TINYINT NOT NULL DEFAULT 1,
    created DATETIME,
    rcon_secret BLOB
)";

#[tokio::test]
async fn test_select_reads_only_named_columns() {
    let store = memory_store().await;
    sqlx::query(SB_SERVERS).execute(store.pool()).await.unwrap();
    sqlx::query(
        "INSERT INTO sb_servers (sid, ip, port, created, rcon_secret) \
         VALUES (4, '203.0.113.10', 27015, '2024-01-01 00:00:00', x'00ff')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let rows = store
        .select(
            "sb_servers",
            &["sid"],
            &[("ip", Cell::from("203.0.113.10")), ("port", Cell::Int(27015))],
        )
        .await
        .unwrap();
    assert_eq!(rows, vec![row([("sid", Cell::Int(4))])]);
}

const SB_ADMINS: &str = "CREATE TABLE sb_admins (
    aid INTEGER PRIMARY KEY AUTOINCREMENT,
    user TEXT NOT NULL,
    authid TEXT NOT NULL,
    password TEXT NOT NULL,
    gid INTEGER NOT NULL,
    email TEXT NOT NULL,
    srv_group TEXT,
    immunity INTEGER NOT NULL,
    lastvisit INTEGER
)";

#[tokio::test]
async fn test_sourcebans_server_lookup_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("sb.db").display());

    // No sb_servers table: the server lookup fails.
    let setup = SqlStore::connect(&url, 1).await.unwrap();
    sqlx::query(SB_ADMINS).execute(setup.pool()).await.unwrap();

    let databases = HashMap::from([(
        "sb".to_string(),
        DatabaseConfig {
            url,
            prefix: None,
            max_connections: 1,
        },
    )]);
    let ctx = DeliveryContext::new(
        Arc::new(SqlStoreProvider::new(databases)),
        Arc::new(common::RecordingConsoles::new()),
    )
    .with_clock(Arc::new(FixedClock::new(NOW)));

    let mut target = server();
    target.rcon = None;
    target
        .connections
        .insert("SourceBans".into(), connection("sb", None));
    let request = GrantRequest::new("sourcebans", user(), target)
        .param("group", "Admins")
        .param("password", "hunter2");

    let err = DriverRegistry::with_defaults()
        .dispatch(&ctx, &request)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "store");

    let admins = setup.select("sb_admins", &["aid"], &[]).await.unwrap();
    assert!(admins.is_empty());
}
