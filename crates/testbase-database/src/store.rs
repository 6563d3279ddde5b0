//! Row-level store interface
//!
//! The factory decouples "what a test needs" from "how it is physically
//! inserted" through this trait: a store can insert one row map and fetch
//! rows back by field equality. The SQL implementation lives on
//! [`TransactionHandle`](crate::TransactionHandle); an in-memory one lives
//! in [`mock`](crate::mock).

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Query, SimpleExpr};
use sea_orm::{DatabaseBackend, DbErr, Statement};
use serde_json::Value as JsonValue;
use testbase_core::Attributes;
use thiserror::Error;

use crate::handle::HandleError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error("insert into {0} returned no row")]
    NoRowReturned(String),
    #[error("failed to build statement for {table}: {message}")]
    Statement { table: String, message: String },
}

/// Narrow insertion/lookup surface a factory binds to.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert one row into `table` and return the stored row.
    ///
    /// A JSON `null` attribute binds as an untyped NULL; builders that want
    /// database defaults should omit the column instead.
    async fn insert_row(&self, table: &str, values: &Attributes) -> Result<JsonValue, StoreError>;

    /// Fetch the rows of `table` matching every field of `filter` by equality.
    async fn find_rows(&self, table: &str, filter: &Attributes) -> Result<Vec<JsonValue>, StoreError>;
}

/// Build a backend-aware `INSERT ... RETURNING *` statement from a row map.
pub(crate) fn build_insert(
    backend: DatabaseBackend,
    table: &str,
    values: &Attributes,
) -> Result<Statement, StoreError> {
    let mut insert = Query::insert();
    insert.into_table(Alias::new(table));

    if values.is_empty() {
        insert.or_default_values();
    } else {
        let mut columns = Vec::with_capacity(values.len());
        let mut row: Vec<SimpleExpr> = Vec::with_capacity(values.len());
        for (column, value) in values {
            columns.push(Alias::new(column));
            row.push(to_db_value(value).into());
        }
        insert.columns(columns);
        insert.values(row).map_err(|e| StoreError::Statement {
            table: table.to_owned(),
            message: e.to_string(),
        })?;
    }

    insert.returning_all();
    Ok(backend.build(&insert))
}

/// Build a backend-aware `SELECT * ... WHERE` statement from an equality filter.
pub(crate) fn build_filter_select(
    backend: DatabaseBackend,
    table: &str,
    filter: &Attributes,
) -> Statement {
    let mut select = Query::select();
    select.column(Asterisk).from(Alias::new(table));
    for (column, value) in filter {
        select.and_where(Expr::col(Alias::new(column)).eq(to_db_value(value)));
    }
    backend.build(&select)
}

fn to_db_value(value: &JsonValue) -> sea_orm::Value {
    match value {
        JsonValue::Null => sea_orm::Value::String(None),
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                (u as i64).into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        JsonValue::String(s) => s.clone().into(),
        other => sea_orm::Value::Json(Some(Box::new(other.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testbase_core::attrs;

    #[test]
    fn insert_statement_returns_the_inserted_row() {
        let values = attrs(json!({"name": "Test User", "email": "t@example.com"}));
        let stmt = build_insert(DatabaseBackend::Postgres, "users", &values).unwrap();

        assert!(stmt.sql.contains("INSERT INTO \"users\""));
        assert!(stmt.sql.contains("RETURNING"));
    }

    #[test]
    fn empty_values_insert_database_defaults() {
        let stmt = build_insert(DatabaseBackend::Sqlite, "users", &Attributes::new()).unwrap();
        assert!(stmt.sql.to_uppercase().contains("DEFAULT VALUES"));
    }

    #[test]
    fn filter_select_constrains_every_field() {
        let filter = attrs(json!({"name": "X", "active": true}));
        let stmt = build_filter_select(DatabaseBackend::Postgres, "users", &filter);

        assert!(stmt.sql.contains("SELECT *"));
        assert!(stmt.sql.contains("\"name\""));
        assert!(stmt.sql.contains("\"active\""));
    }
}
