//! Driver contract and the SeaORM implementation
//!
//! A driver knows how to do three things per test: acquire a connection,
//! begin a transaction at a requested isolation level, and release the
//! connection. Rollback is a primitive of the handle itself, so the commit
//! path simply does not exist in this subsystem.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, TransactionTrait,
};
use thiserror::Error;
use tracing::debug;

use crate::handle::TransactionHandle;

/// Standard SQL isolation levels, selected at begin time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    #[default]
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn to_sea_orm(self) -> sea_orm::IsolationLevel {
        match self {
            IsolationLevel::ReadUncommitted => sea_orm::IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted => sea_orm::IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead => sea_orm::IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable => sea_orm::IsolationLevel::Serializable,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("driver failure: {0}")]
    Other(#[from] anyhow::Error),
}

/// Per-driver contract the isolator runs against.
///
/// `connect` is invoked once per test; `destroy` must release that
/// connection exactly once, even when `begin` or the test itself failed.
#[async_trait]
pub trait IsolationDriver: Send + Sync {
    type Connection: Send + Sync;

    async fn connect(&self) -> Result<Self::Connection, DriverError>;

    async fn begin(
        &self,
        conn: &Self::Connection,
        level: IsolationLevel,
    ) -> Result<TransactionHandle, DriverError>;

    async fn destroy(&self, conn: Self::Connection) -> Result<(), DriverError>;
}

/// Caller-supplied connection factory, invoked once per test.
pub type ConnectionFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<DatabaseConnection, DbErr>> + Send + Sync>;

/// [`IsolationDriver`] over a SeaORM connection.
pub struct SeaOrmDriver {
    factory: ConnectionFactory,
}

impl SeaOrmDriver {
    pub fn new(factory: ConnectionFactory) -> Self {
        Self { factory }
    }

    /// Driver that connects to `url` once per test.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(Arc::new(move || {
            let url = url.clone();
            Box::pin(async move { Database::connect(&url).await })
        }))
    }
}

#[async_trait]
impl IsolationDriver for SeaOrmDriver {
    type Connection = DatabaseConnection;

    async fn connect(&self) -> Result<DatabaseConnection, DriverError> {
        debug!("Acquiring database connection");
        Ok((self.factory)().await?)
    }

    async fn begin(
        &self,
        conn: &DatabaseConnection,
        level: IsolationLevel,
    ) -> Result<TransactionHandle, DriverError> {
        let backend = conn.get_database_backend();
        // SQLite has no per-transaction isolation clause; its transactions
        // are serializable already.
        let txn = match backend {
            DatabaseBackend::Sqlite => conn.begin().await?,
            _ => conn.begin_with_config(Some(level.to_sea_orm()), None).await?,
        };
        debug!("Transaction started at {}", level);
        Ok(TransactionHandle::new(txn, backend, level))
    }

    async fn destroy(&self, conn: DatabaseConnection) -> Result<(), DriverError> {
        conn.close().await?;
        debug!("Database connection released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_isolation_level_is_repeatable_read() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::RepeatableRead);
    }

    #[test]
    fn isolation_levels_render_as_standard_sql() {
        assert_eq!(IsolationLevel::Serializable.to_string(), "SERIALIZABLE");
        assert_eq!(IsolationLevel::RepeatableRead.to_string(), "REPEATABLE READ");
        assert_eq!(IsolationLevel::ReadCommitted.to_string(), "READ COMMITTED");
        assert_eq!(
            IsolationLevel::ReadUncommitted.to_string(),
            "READ UNCOMMITTED"
        );
    }
}
