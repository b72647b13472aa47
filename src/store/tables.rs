//! Prefix-aware table access for one backend deployment.

use super::{Filter, GrantStore, Row, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Outcome of [`BackendTables::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// An existing row was updated in place.
    Updated,
    /// A new row was inserted; carries the generated key when known.
    Inserted(Option<i64>),
}

/// A store plus the table prefix resolved for the target deployment.
#[derive(Clone)]
pub struct BackendTables {
    store: Arc<dyn GrantStore>,
    prefix: String,
}

impl BackendTables {
    pub fn new(store: Arc<dyn GrantStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The resolved prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical name of a logical table.
    pub fn name(&self, table: &str) -> String {
        format!("{}{table}", self.prefix)
    }

    pub async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        self.store.select(&self.name(table), columns, filters).await
    }

    /// `columns` of the first row matching every filter.
    pub async fn find(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[Filter<'_>],
    ) -> Result<Option<Row>, StoreError> {
        Ok(self.select(table, columns, filters).await?.into_iter().next())
    }

    pub async fn insert(&self, table: &str, row: &Row) -> Result<Option<i64>, StoreError> {
        self.store.insert(&self.name(table), row).await
    }

    pub async fn update(
        &self,
        table: &str,
        values: &Row,
        filters: &[Filter<'_>],
    ) -> Result<u64, StoreError> {
        self.store.update(&self.name(table), values, filters).await
    }

    /// Update the row keyed by `key`, or insert `key + values + insert_extra`.
    ///
    /// The key columns are never rewritten, so repeated calls never produce a
    /// second row for the same key.
    pub async fn upsert(
        &self,
        table: &str,
        key: &[Filter<'_>],
        values: &Row,
        insert_extra: &Row,
    ) -> Result<Upserted, StoreError> {
        let key_columns: Vec<&str> = key.iter().map(|(column, _)| *column).collect();
        if self.find(table, &key_columns, key).await?.is_some() {
            self.update(table, values, key).await?;
            debug!(table = %self.name(table), "upsert updated existing row");
            return Ok(Upserted::Updated);
        }

        let mut row = insert_extra.clone();
        row.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        row.extend(key.iter().map(|(k, v)| (k.to_string(), v.clone())));
        let id = self.insert(table, &row).await?;
        debug!(table = %self.name(table), ?id, "upsert inserted new row");
        Ok(Upserted::Inserted(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Cell, MemoryStore, row};

    #[tokio::test]
    async fn test_upsert_never_duplicates() {
        let memory = Arc::new(MemoryStore::new());
        let tables = BackendTables::new(memory.clone(), "vip_");
        let key = [("account_id", Cell::Int(7)), ("sid", Cell::Int(1))];

        let first = tables
            .upsert(
                "users",
                &key,
                &row([("group", Cell::from("gold"))]),
                &row([("name", Cell::from("alice"))]),
            )
            .await
            .unwrap();
        assert_eq!(first, Upserted::Inserted(None));

        let second = tables
            .upsert(
                "users",
                &key,
                &row([("group", Cell::from("silver"))]),
                &row([("name", Cell::from("ignored"))]),
            )
            .await
            .unwrap();
        assert_eq!(second, Upserted::Updated);

        let rows = memory.rows("vip_users");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("group"), Some(&Cell::from("silver")));
        assert_eq!(rows[0].get("name"), Some(&Cell::from("alice")));
        assert!(memory.rows("users").is_empty());
    }

    #[test]
    fn test_name_prefix() {
        let tables = BackendTables::new(Arc::new(MemoryStore::new()), "");
        assert_eq!(tables.name("users"), "users");
        assert_eq!(tables.prefix(), "");
    }
}
