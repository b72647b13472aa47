//! SQL grant store over the SQLx `Any` driver.
//!
//! Statements are built per call from validated identifiers and bound values,
//! so one implementation serves every backend schema on MySQL or SQLite.

use super::{Cell, Filter, GrantStore, Row, StoreError, StoreProvider, quote_ident};
use crate::config::DatabaseConfig;
use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row as _, ValueRef};
use std::collections::HashMap;
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::{debug, info};

static INSTALL_DRIVERS: Once = Once::new();

/// A pooled SQL connection to one backend database.
#[derive(Clone)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connection acquire timeout - a stalled backend must not hang a delivery.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connect to `url` (`mysql://...` or `sqlite:...`).
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect(url)
            .await?;

        info!(backend = %url.split(':').next().unwrap_or("unknown"), "Grant store connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

fn bind_cell<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    cell: &Cell,
) -> Query<'q, Any, AnyArguments<'q>> {
    match cell {
        Cell::Null => query.bind(None::<String>),
        Cell::Int(i) => query.bind(*i),
        Cell::Text(s) => query.bind(s.clone()),
    }
}

fn where_clause(filters: &[Filter<'_>]) -> Result<String, StoreError> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let parts = filters
        .iter()
        .map(|(column, _)| quote_ident(column).map(|c| format!("{c} = ?")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn column_list(columns: &[&str]) -> Result<String, StoreError> {
    if columns.is_empty() {
        return Err(StoreError::Internal("select without columns".into()));
    }
    let quoted = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quoted.join(", "))
}

fn decode_row(row: &AnyRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let cell = if row.try_get_raw(idx)?.is_null() {
            Cell::Null
        } else if let Ok(i) = row.try_get::<i64, _>(idx) {
            Cell::Int(i)
        } else if let Ok(s) = row.try_get::<String, _>(idx) {
            Cell::Text(s)
        } else if let Ok(f) = row.try_get::<f64, _>(idx) {
            Cell::Text(f.to_string())
        } else {
            let bytes: Vec<u8> = row.try_get(idx)?;
            Cell::Text(String::from_utf8_lossy(&bytes).into_owned())
        };
        out.insert(column.name().to_string(), cell);
    }
    Ok(out)
}

#[async_trait]
impl GrantStore for SqlStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {}{}",
            column_list(columns)?,
            quote_ident(table)?,
            where_clause(filters)?
        );
        debug!(sql = %sql, "store select");

        let mut query = sqlx::query::<Any>(&sql);
        for (_, value) in filters {
            query = bind_cell(query, value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Option<i64>, StoreError> {
        if row.is_empty() {
            return Err(StoreError::Internal(format!("empty insert into {table}")));
        }
        let columns = row
            .keys()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(table)?,
            columns.join(", ")
        );
        debug!(sql = %sql, "store insert");

        let mut query = sqlx::query::<Any>(&sql);
        for value in row.values() {
            query = bind_cell(query, value);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_id())
    }

    async fn update(
        &self,
        table: &str,
        values: &Row,
        filters: &[Filter<'_>],
    ) -> Result<u64, StoreError> {
        if values.is_empty() {
            return Ok(0);
        }
        let assignments = values
            .keys()
            .map(|c| quote_ident(c).map(|c| format!("{c} = ?")))
            .collect::<Result<Vec<_>, _>>()?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote_ident(table)?,
            assignments.join(", "),
            where_clause(filters)?
        );
        debug!(sql = %sql, "store update");

        let mut query = sqlx::query::<Any>(&sql);
        for value in values.values() {
            query = bind_cell(query, value);
        }
        for (_, value) in filters {
            query = bind_cell(query, value);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Opens SQL stores lazily per configured database and reuses their pools.
pub struct SqlStoreProvider {
    databases: HashMap<String, DatabaseConfig>,
    stores: DashMap<String, Arc<SqlStore>>,
}

impl SqlStoreProvider {
    pub fn new(databases: HashMap<String, DatabaseConfig>) -> Self {
        Self {
            databases,
            stores: DashMap::new(),
        }
    }
}

#[async_trait]
impl StoreProvider for SqlStoreProvider {
    async fn open(&self, database: &str) -> Result<Arc<dyn GrantStore>, StoreError> {
        let cached = self.stores.get(database).map(|s| Arc::clone(s.value()));
        let store = match cached {
            Some(store) => store,
            None => {
                let config = self
                    .databases
                    .get(database)
                    .ok_or_else(|| StoreError::UnknownDatabase(database.to_string()))?;
                let store = Arc::new(SqlStore::connect(&config.url, config.max_connections).await?);
                self.stores.insert(database.to_string(), Arc::clone(&store));
                store
            }
        };
        Ok(store)
    }

    fn prefix(&self, database: &str) -> Option<String> {
        self.databases
            .get(database)
            .and_then(|d| d.prefix.clone())
            .filter(|p| !p.is_empty())
    }
}
