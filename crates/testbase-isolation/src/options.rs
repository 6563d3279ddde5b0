//! Isolation configuration surface

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use testbase_database::{IsolationLevel, TransactionHandle};
use testbase_factory::{EntityFactory, FactoryRegistry};

use crate::fixtures::FixtureComposer;

/// Pre-test setup callback, run inside the transaction before the body.
pub type SetupFn =
    Arc<dyn Fn(Arc<TransactionHandle>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Configuration for a [`TransactionIsolator`](crate::TransactionIsolator):
/// isolation level (default `REPEATABLE READ`), optional setup callback and
/// any number of named fixture creators.
#[derive(Clone, Default)]
pub struct IsolationOptions {
    pub(crate) isolation_level: IsolationLevel,
    pub(crate) setup: Option<SetupFn>,
    pub(crate) fixtures: FixtureComposer,
}

impl IsolationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    /// Run `setup` inside the transaction before every test body, e.g. to
    /// materialize schema. A setup failure aborts the test before it runs.
    pub fn setup<F, Fut>(mut self, setup: F) -> Self
    where
        F: Fn(Arc<TransactionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.setup = Some(Arc::new(move |handle| setup(handle).boxed()));
        self
    }

    /// Expose an additional named value to the test body, computed once per
    /// test from the transaction handle.
    pub fn fixture<F, Fut, T>(mut self, name: impl Into<String>, creator: F) -> Self
    where
        F: Fn(Arc<TransactionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.fixtures.register(name, creator);
        self
    }

    /// Expose an [`EntityFactory`] bound to the test's transaction under
    /// `name`. This is the canonical fixture composition.
    pub fn factory(
        self,
        name: impl Into<String>,
        registry: Arc<FactoryRegistry<TransactionHandle>>,
    ) -> Self {
        self.fixture(name, move |txn| {
            let registry = Arc::clone(&registry);
            async move { Ok(EntityFactory::new(registry, txn)) }
        })
    }
}
