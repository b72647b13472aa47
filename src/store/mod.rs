//! Grant store collaborator.
//!
//! Backends are treated as opaque row sets addressed by three operations:
//! equality-filtered select, insert and filtered update. No joins, no
//! cross-table transactions, no schema management.
//!
//! Selects name the columns they read. Backend tables carry columns the
//! `Any` driver cannot decode (MySQL `TINYINT`, `DATETIME`, ...), so a
//! row is never fetched whole.
//!
//! - [`sql::SqlStore`]: MySQL / SQLite through the SQLx `Any` driver
//! - [`memory::MemoryStore`]: in-process rows for dry runs and tests
//! - [`tables::BackendTables`]: prefix-aware adapter with upsert on top of either

pub mod memory;
pub mod sql;
pub mod tables;

pub use memory::{MemoryProvider, MemoryStore};
pub use sql::{SqlStore, SqlStoreProvider};
pub use tables::{BackendTables, Upserted};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("database '{0}' is not configured")]
    UnknownDatabase(String),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("{0}")]
    Internal(String),
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Int(i64),
    Text(String),
}

impl Cell {
    /// Integer view; numeric text is accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// Text view of the value (`None` for NULL).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Int(i) => Some(i.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Null => None,
        }
    }

    /// Comparison the way the backends' SQL engines compare mixed types:
    /// `1` equals `'1'`.
    pub fn loose_eq(&self, other: &Cell) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Int(a), Self::Text(b)) | (Self::Text(b), Self::Int(a)) => {
                b.trim().parse::<i64>().is_ok_and(|b| b == *a)
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u16> for Cell {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A row: column name -> value.
pub type Row = BTreeMap<String, Cell>;

/// Equality predicate on one column; a slice of them is a conjunction.
pub type Filter<'a> = (&'a str, Cell);

/// Build a [`Row`] from `(column, value)` pairs.
pub fn row<const N: usize>(pairs: [(&str, Cell); N]) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Minimal row store a driver reads and writes grants through.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// `columns` of the rows of `table` matching every filter.
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter<'_>],
    ) -> Result<Vec<Row>, StoreError>;

    /// Insert `row`, returning the generated key when the backend reports one.
    async fn insert(&self, table: &str, row: &Row) -> Result<Option<i64>, StoreError>;

    /// Set `values` on rows matching every filter, returning the affected count.
    async fn update(
        &self,
        table: &str,
        values: &Row,
        filters: &[Filter<'_>],
    ) -> Result<u64, StoreError>;
}

/// Supplies stores for named databases.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Open (or reuse) the store for `database`.
    async fn open(&self, database: &str) -> Result<Arc<dyn GrantStore>, StoreError>;

    /// Table prefix configured for `database`, if any.
    fn prefix(&self, database: &str) -> Option<String>;
}

/// Validate and backtick-quote a table or column name.
pub(crate) fn quote_ident(name: &str) -> Result<String, StoreError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(format!("`{name}`"))
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_eq() {
        assert!(Cell::Int(5).loose_eq(&Cell::from("5")));
        assert!(Cell::from(" 5").loose_eq(&Cell::Int(5)));
        assert!(!Cell::Int(5).loose_eq(&Cell::from("five")));
        assert!(!Cell::Null.loose_eq(&Cell::Null));
        assert!(Cell::from("gold").loose_eq(&Cell::from("gold")));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("group").unwrap(), "`group`");
        assert_eq!(quote_ident("vip_users").unwrap(), "`vip_users`");
        assert!(quote_ident("users; DROP").is_err());
        assert!(quote_ident("").is_err());
    }

    #[test]
    fn test_row_builder() {
        let r = row([("sid", Cell::Int(1)), ("name", Cell::from(None::<String>))]);
        assert_eq!(r.get("sid"), Some(&Cell::Int(1)));
        assert_eq!(r.get("name"), Some(&Cell::Null));
    }
}
