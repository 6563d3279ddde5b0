//! In-memory mock adapter
//!
//! A simple filtered map, not an engine: rows live in per-table vectors and
//! lookups compare fields for equality. Useful for exercising factories and
//! seeds without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use testbase_core::Attributes;
use tokio::sync::Mutex;

use crate::store::{EntityStore, StoreError};

#[derive(Default)]
struct TableData {
    rows: Vec<JsonValue>,
    next_id: i64,
}

/// [`EntityStore`] over an in-memory map of tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, TableData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.lock().await;
        tables.get(table).map(|data| data.rows.len()).unwrap_or(0)
    }

    /// Drop every table.
    pub async fn clear(&self) {
        self.tables.lock().await.clear();
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_row(&self, table: &str, values: &Attributes) -> Result<JsonValue, StoreError> {
        let mut tables = self.tables.lock().await;
        let data = tables.entry(table.to_owned()).or_default();

        let mut row = values.clone();
        if !row.contains_key("id") {
            data.next_id += 1;
            row.insert("id".to_owned(), json!(data.next_id));
        }

        let row = JsonValue::Object(row);
        data.rows.push(row.clone());
        Ok(row)
    }

    async fn find_rows(&self, table: &str, filter: &Attributes) -> Result<Vec<JsonValue>, StoreError> {
        let tables = self.tables.lock().await;
        let rows = match tables.get(table) {
            Some(data) => data
                .rows
                .iter()
                .filter(|row| {
                    filter
                        .iter()
                        .all(|(key, value)| row.get(key) == Some(value))
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testbase_core::attrs;

    #[tokio::test]
    async fn inserted_rows_are_assigned_increasing_ids() -> anyhow::Result<()> {
        let store = MemoryStore::new();

        let first = store
            .insert_row("users", &attrs(json!({"name": "A"})))
            .await?;
        let second = store
            .insert_row("users", &attrs(json!({"name": "B"})))
            .await?;

        assert_eq!(first.get("id"), Some(&json!(1)));
        assert_eq!(second.get("id"), Some(&json!(2)));
        assert_eq!(store.row_count("users").await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn explicit_ids_are_preserved() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let row = store
            .insert_row("users", &attrs(json!({"id": 42, "name": "A"})))
            .await?;
        assert_eq!(row.get("id"), Some(&json!(42)));
        Ok(())
    }

    #[tokio::test]
    async fn find_rows_filters_by_field_equality() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store
            .insert_row("users", &attrs(json!({"name": "A", "active": true})))
            .await?;
        store
            .insert_row("users", &attrs(json!({"name": "B", "active": false})))
            .await?;
        store
            .insert_row("users", &attrs(json!({"name": "C", "active": true})))
            .await?;

        let active = store
            .find_rows("users", &attrs(json!({"active": true})))
            .await?;
        assert_eq!(active.len(), 2);

        let missing = store
            .find_rows("users", &attrs(json!({"name": "Z"})))
            .await?;
        assert!(missing.is_empty());

        let unknown_table = store.find_rows("ghosts", &Attributes::new()).await?;
        assert!(unknown_table.is_empty());
        Ok(())
    }
}
