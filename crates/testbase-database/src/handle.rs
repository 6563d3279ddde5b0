//! Per-test transaction handle
//!
//! One handle wraps exactly one open driver transaction. The isolator owns
//! its lifecycle and rolls it back exactly once per test; fixtures share it
//! through `Arc` for the test's duration. Statements dispatched after the
//! rollback fail with [`HandleError::Closed`] instead of touching a stale
//! connection.

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr, ExecResult, FromQueryResult,
    JsonValue, QueryResult, Statement,
};
use testbase_core::Attributes;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::driver::IsolationLevel;
use crate::store::{build_filter_select, build_insert, EntityStore, StoreError};

#[derive(Error, Debug)]
pub enum HandleError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("transaction already closed")]
    Closed,
}

/// One open transaction, destroyed exactly once.
///
/// The internal lock also serializes statements dispatched concurrently
/// against this handle, matching the driver's own single-connection
/// statement ordering.
pub struct TransactionHandle {
    txn: Mutex<Option<DatabaseTransaction>>,
    backend: DatabaseBackend,
    isolation_level: IsolationLevel,
}

impl TransactionHandle {
    pub(crate) fn new(
        txn: DatabaseTransaction,
        backend: DatabaseBackend,
        isolation_level: IsolationLevel,
    ) -> Self {
        Self {
            txn: Mutex::new(Some(txn)),
            backend,
            isolation_level,
        }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// Isolation level the transaction was begun at.
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub async fn is_open(&self) -> bool {
        self.txn.lock().await.is_some()
    }

    /// Execute a statement inside the transaction.
    pub async fn execute(&self, stmt: Statement) -> Result<ExecResult, HandleError> {
        let guard = self.txn.lock().await;
        let txn = guard.as_ref().ok_or(HandleError::Closed)?;
        Ok(txn.execute(stmt).await?)
    }

    /// Execute raw SQL inside the transaction.
    pub async fn execute_sql(&self, sql: &str) -> Result<ExecResult, HandleError> {
        self.execute(Statement::from_string(self.backend, sql.to_owned()))
            .await
    }

    pub async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, HandleError> {
        let guard = self.txn.lock().await;
        let txn = guard.as_ref().ok_or(HandleError::Closed)?;
        Ok(txn.query_one(stmt).await?)
    }

    pub async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, HandleError> {
        let guard = self.txn.lock().await;
        let txn = guard.as_ref().ok_or(HandleError::Closed)?;
        Ok(txn.query_all(stmt).await?)
    }

    /// Query a single row materialized as JSON.
    pub async fn query_json_one(&self, stmt: Statement) -> Result<Option<JsonValue>, HandleError> {
        let guard = self.txn.lock().await;
        let txn = guard.as_ref().ok_or(HandleError::Closed)?;
        Ok(JsonValue::find_by_statement(stmt).one(txn).await?)
    }

    /// Query all matching rows materialized as JSON.
    pub async fn query_json_all(&self, stmt: Statement) -> Result<Vec<JsonValue>, HandleError> {
        let guard = self.txn.lock().await;
        let txn = guard.as_ref().ok_or(HandleError::Closed)?;
        Ok(JsonValue::find_by_statement(stmt).all(txn).await?)
    }

    /// Roll the transaction back and close the handle.
    ///
    /// A second call fails with [`HandleError::Closed`]; the transaction is
    /// destroyed exactly once.
    pub async fn rollback(&self) -> Result<(), HandleError> {
        let mut guard = self.txn.lock().await;
        let txn = guard.take().ok_or(HandleError::Closed)?;
        txn.rollback().await?;
        debug!("Test transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("backend", &self.backend)
            .field("isolation_level", &self.isolation_level)
            .finish()
    }
}

#[async_trait]
impl EntityStore for TransactionHandle {
    async fn insert_row(&self, table: &str, values: &Attributes) -> Result<JsonValue, StoreError> {
        let stmt = build_insert(self.backend, table, values)?;
        let row = self.query_json_one(stmt).await?;
        row.ok_or_else(|| StoreError::NoRowReturned(table.to_owned()))
    }

    async fn find_rows(&self, table: &str, filter: &Attributes) -> Result<Vec<JsonValue>, StoreError> {
        let stmt = build_filter_select(self.backend, table, filter);
        Ok(self.query_json_all(stmt).await?)
    }
}
