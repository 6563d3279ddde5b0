//! Thin migration shims
//!
//! These wrappers only sequence externally supplied migration scripts and
//! forward to the migration runner; schema ownership stays with the
//! consuming suite.

pub use sea_orm_migration::MigratorTrait;

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::{Deserialize, Serialize};
use testbase_database::{HandleError, TransactionHandle};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("migration {name} failed: {source}")]
    Script {
        name: String,
        #[source]
        source: sea_orm::DbErr,
    },
    #[error("migration {name} failed: {source}")]
    ScriptOnHandle {
        name: String,
        #[source]
        source: HandleError,
    },
    #[error("migration runner failed: {0}")]
    Runner(#[from] sea_orm::DbErr),
}

/// One named migration script.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MigrationScript {
    pub name: String,
    pub sql: String,
}

impl MigrationScript {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Applies externally supplied SQL scripts in registration order.
#[derive(Clone, Debug, Default)]
pub struct ScriptMigrator {
    scripts: Vec<MigrationScript>,
}

impl ScriptMigrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.scripts.push(MigrationScript::new(name, sql));
        self
    }

    pub fn from_scripts(scripts: Vec<MigrationScript>) -> Self {
        Self { scripts }
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Apply every script, in order, on a plain connection.
    pub async fn up<C: ConnectionTrait>(&self, db: &C) -> Result<(), MigrationError> {
        for script in &self.scripts {
            info!("Applying migration script: {}", script.name);
            let stmt = Statement::from_string(db.get_database_backend(), script.sql.clone());
            db.execute(stmt)
                .await
                .map_err(|source| MigrationError::Script {
                    name: script.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Apply every script inside an open test transaction, so the schema is
    /// rolled back with the rest of the test's writes.
    pub async fn up_on(&self, handle: &TransactionHandle) -> Result<(), MigrationError> {
        for script in &self.scripts {
            info!("Applying migration script in transaction: {}", script.name);
            handle
                .execute_sql(&script.sql)
                .await
                .map_err(|source| MigrationError::ScriptOnHandle {
                    name: script.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// Log-and-forward wrapper over any SeaORM migrator.
pub async fn run_migrator<M: MigratorTrait>(db: &DatabaseConnection) -> Result<(), MigrationError> {
    info!("Running migrations via {}", std::any::type_name::<M>());
    M::up(db, None).await?;
    Ok(())
}
