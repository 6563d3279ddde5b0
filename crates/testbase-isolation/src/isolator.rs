//! The per-test isolation state machine

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use testbase_database::{DriverError, HandleError, IsolationDriver};
use thiserror::Error;
use tracing::{debug, error};

use crate::fixtures::TestContext;
use crate::options::IsolationOptions;

/// Explicit result of one isolated test run.
///
/// A failing test body is an outcome, not an isolator error: rollback and
/// release have already completed by the time it is reported.
#[derive(Debug)]
pub enum RunOutcome {
    Passed,
    Failed { error: anyhow::Error },
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, RunOutcome::Passed)
    }

    /// Re-raise the body's failure, preserving the original error.
    pub fn into_result(self) -> anyhow::Result<()> {
        match self {
            RunOutcome::Passed => Ok(()),
            RunOutcome::Failed { error } => Err(error),
        }
    }
}

/// Failures of the harness itself, distinct from test-body failures.
#[derive(Error, Debug)]
pub enum IsolationError {
    #[error("failed to acquire connection: {0}")]
    Acquire(#[source] DriverError),
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] DriverError),
    #[error("setup failed: {0}")]
    Setup(#[source] anyhow::Error),
    #[error("fixture {name} failed: {source}")]
    Fixture {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to roll back transaction: {0}")]
    Rollback(#[source] HandleError),
    #[error("failed to release connection: {0}")]
    Release(#[source] DriverError),
}

enum Settled {
    Outcome(RunOutcome),
    Panicked(Box<dyn Any + Send>),
}

/// Wraps a test body in a guaranteed-rollback transaction.
///
/// Per test: acquire a connection, begin a transaction at the configured
/// isolation level, run setup and fixture composition inside it, run the
/// body, then always roll back and release. The commit path does not exist.
pub struct TransactionIsolator<D: IsolationDriver> {
    driver: D,
    options: IsolationOptions,
}

impl<D: IsolationDriver> TransactionIsolator<D> {
    pub fn new(driver: D) -> Self {
        Self::with_options(driver, IsolationOptions::default())
    }

    pub fn with_options(driver: D, options: IsolationOptions) -> Self {
        Self { driver, options }
    }

    /// Run one isolated test.
    ///
    /// Returns `Ok(RunOutcome)` for a body that passed or failed (after
    /// rollback and release), and `Err(IsolationError)` when the harness
    /// itself failed. A release failure never masks a captured body
    /// failure; a panicking body is resumed after rollback and release.
    pub async fn run<F, Fut>(&self, body: F) -> Result<RunOutcome, IsolationError>
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let conn = self
            .driver
            .connect()
            .await
            .map_err(IsolationError::Acquire)?;

        let settled = self.run_in_transaction(&conn, body).await;

        let released = self.driver.destroy(conn).await;
        if let Err(release_error) = &released {
            error!("Failed to release test connection: {}", release_error);
        }

        match settled {
            Err(harness_error) => Err(harness_error),
            Ok(Settled::Panicked(payload)) => std::panic::resume_unwind(payload),
            Ok(Settled::Outcome(outcome)) => match (outcome, released) {
                // The body's failure takes priority over a release failure.
                (RunOutcome::Passed, Err(release_error)) => {
                    Err(IsolationError::Release(release_error))
                }
                (outcome, _) => Ok(outcome),
            },
        }
    }

    /// Run one isolated test, flattening the outcome for direct use in a
    /// `#[tokio::test]` body. The body's original error is re-raised as-is.
    pub async fn run_test<F, Fut>(&self, body: F) -> anyhow::Result<()>
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        match self.run(body).await {
            Ok(outcome) => outcome.into_result(),
            Err(harness_error) => Err(anyhow::Error::new(harness_error)),
        }
    }

    async fn run_in_transaction<F, Fut>(
        &self,
        conn: &D::Connection,
        body: F,
    ) -> Result<Settled, IsolationError>
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let handle = Arc::new(
            self.driver
                .begin(conn, self.options.isolation_level)
                .await
                .map_err(IsolationError::Begin)?,
        );

        let settled = self.stage_and_run(&handle, body).await;

        let rolled_back = handle.rollback().await;
        if let Err(rollback_error) = &rolled_back {
            error!("Failed to roll back test transaction: {}", rollback_error);
        }

        match settled {
            Err(harness_error) => Err(harness_error),
            Ok(Settled::Outcome(RunOutcome::Passed)) => {
                rolled_back.map_err(IsolationError::Rollback)?;
                Ok(Settled::Outcome(RunOutcome::Passed))
            }
            // A body failure or panic takes priority over a rollback failure.
            Ok(other) => Ok(other),
        }
    }

    async fn stage_and_run<F, Fut>(
        &self,
        handle: &Arc<testbase_database::TransactionHandle>,
        body: F,
    ) -> Result<Settled, IsolationError>
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        if let Some(setup) = &self.options.setup {
            debug!("Running pre-test setup");
            setup(Arc::clone(handle))
                .await
                .map_err(IsolationError::Setup)?;
        }

        let fixtures = self.options.fixtures.compose(handle).await?;
        let context = TestContext {
            txn: Arc::clone(handle),
            fixtures,
        };

        match AssertUnwindSafe(body(context)).catch_unwind().await {
            Ok(Ok(())) => {
                debug!("Test body passed");
                Ok(Settled::Outcome(RunOutcome::Passed))
            }
            Ok(Err(error)) => {
                debug!("Test body failed: {:#}", error);
                Ok(Settled::Outcome(RunOutcome::Failed { error }))
            }
            Err(payload) => Ok(Settled::Panicked(payload)),
        }
    }
}
