//! In-process grant store.

use super::{Cell, Filter, GrantStore, Row, StoreError, StoreProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    auto_key: Option<String>,
}

impl Table {
    fn next_id(&self, key: &str) -> i64 {
        self.rows
            .iter()
            .filter_map(|r| r.get(key).and_then(Cell::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Rows kept in memory, keyed by table name.
///
/// Counts every insert and update so callers can assert that nothing was written.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate `column` for inserted rows of `table` that lack it.
    pub fn auto_increment(&self, table: &str, column: &str) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .auto_key = Some(column.to_string());
    }

    /// Add a row without counting it as a write.
    pub fn seed(&self, table: &str, row: Row) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .rows
            .push(row);
    }

    /// Snapshot of every row in `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Number of inserts and updates performed through [`GrantStore`].
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

fn row_matches(row: &Row, filters: &[Filter<'_>]) -> bool {
    filters
        .iter()
        .all(|(column, value)| row.get(*column).is_some_and(|v| v.loose_eq(value)))
}

/// The requested columns of `row`; columns the row lacks are left out.
fn project(row: &Row, columns: &[&str]) -> Row {
    columns
        .iter()
        .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        if columns.is_empty() {
            return Err(StoreError::Internal("select without columns".into()));
        }
        let tables = self.tables.lock();
        Ok(tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|r| row_matches(r, filters))
                    .map(|r| project(r, columns))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Option<i64>, StoreError> {
        let mut tables = self.tables.lock();
        let table = tables.entry(table.to_string()).or_default();
        let mut row = row.clone();

        let id = match table.auto_key.clone() {
            Some(key) => match row.get(&key).and_then(Cell::as_i64) {
                Some(existing) => Some(existing),
                None => {
                    let id = table.next_id(&key);
                    row.insert(key, Cell::Int(id));
                    Some(id)
                }
            },
            None => None,
        };

        table.rows.push(row);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    async fn update(
        &self,
        table: &str,
        values: &Row,
        filters: &[Filter<'_>],
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let mut affected = 0;
        if let Some(table) = tables.get_mut(table) {
            for row in table.rows.iter_mut().filter(|r| row_matches(r, filters)) {
                for (column, value) in values {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(affected)
    }
}

/// Serves one shared [`MemoryStore`] for every database name.
pub struct MemoryProvider {
    store: Arc<MemoryStore>,
    prefixes: HashMap<String, String>,
}

impl MemoryProvider {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            prefixes: HashMap::new(),
        }
    }

    /// Configure a table prefix for `database`.
    pub fn with_prefix(mut self, database: &str, prefix: &str) -> Self {
        self.prefixes.insert(database.to_string(), prefix.to_string());
        self
    }
}

#[async_trait]
impl StoreProvider for MemoryProvider {
    async fn open(&self, _database: &str) -> Result<Arc<dyn GrantStore>, StoreError> {
        let store: Arc<dyn GrantStore> = self.store.clone();
        Ok(store)
    }

    fn prefix(&self, database: &str) -> Option<String> {
        self.prefixes.get(database).cloned()
    }
}
