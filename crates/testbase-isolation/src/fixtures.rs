//! Fixture composition
//!
//! A fixture is a named value derived once per test from the transaction
//! handle (or independent of it) and exposed to the test body alongside the
//! transaction. The canonical fixture is an `EntityFactory` bound to the
//! test's transaction.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::FutureExt;
use testbase_database::TransactionHandle;
use tracing::debug;

use crate::isolator::IsolationError;

/// Type-erased fixture value; retrieved back with [`FixtureSet::get`].
pub type FixtureValue = Arc<dyn Any + Send + Sync>;

type FixtureFn =
    Arc<dyn Fn(Arc<TransactionHandle>) -> BoxFuture<'static, anyhow::Result<FixtureValue>> + Send + Sync>;

/// Ordered set of fixture creators, evaluated once per test after the
/// transaction exists and before the test body runs.
#[derive(Clone, Default)]
pub struct FixtureComposer {
    creators: Vec<(String, FixtureFn)>,
}

impl FixtureComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture creator under `name`. Creators run in
    /// registration order.
    pub fn register<F, Fut, T>(&mut self, name: impl Into<String>, creator: F)
    where
        F: Fn(Arc<TransactionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + Sync + 'static,
    {
        let creator: FixtureFn = Arc::new(move |handle| {
            let fut = creator(handle);
            async move { fut.await.map(|value| Arc::new(value) as FixtureValue) }.boxed()
        });
        self.creators.push((name.into(), creator));
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    pub(crate) async fn compose(
        &self,
        handle: &Arc<TransactionHandle>,
    ) -> Result<FixtureSet, IsolationError> {
        let mut values = HashMap::with_capacity(self.creators.len());
        for (name, creator) in &self.creators {
            debug!("Composing fixture: {}", name);
            let value = creator(Arc::clone(handle))
                .await
                .map_err(|source| IsolationError::Fixture {
                    name: name.clone(),
                    source,
                })?;
            values.insert(name.clone(), value);
        }
        Ok(FixtureSet { values })
    }
}

/// The fixtures composed for one test, retrieved by name and type.
#[derive(Default)]
pub struct FixtureSet {
    values: HashMap<String, FixtureValue>,
}

impl FixtureSet {
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.values
            .get(name)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Everything a test body receives: the transaction and its fixtures.
pub struct TestContext {
    pub txn: Arc<TransactionHandle>,
    pub fixtures: FixtureSet,
}

impl TestContext {
    /// Fetch a fixture, failing with a descriptive error when the name is
    /// unknown or the type does not match.
    pub fn fixture<T: Send + Sync + 'static>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        self.fixtures
            .get::<T>(name)
            .ok_or_else(|| anyhow!("fixture not found: {}", name))
    }
}
