//! Per-test transaction isolation
//!
//! The [`TransactionIsolator`] wraps a test body in a guaranteed-rollback
//! database transaction: acquire a connection, begin at the configured
//! isolation level, run optional setup and fixture composition inside the
//! transaction, run the body, then always roll back and release, whether
//! the body passed, failed or panicked.

mod fixtures;
mod isolator;
mod options;

pub use fixtures::{FixtureComposer, FixtureSet, FixtureValue, TestContext};
pub use isolator::{IsolationError, RunOutcome, TransactionIsolator};
pub use options::{IsolationOptions, SetupFn};

// Re-export the driver surface so suites depend on one crate.
pub use testbase_database::{
    DriverError, IsolationDriver, IsolationLevel, SeaOrmDriver, TransactionHandle,
};
