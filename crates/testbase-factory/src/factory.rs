//! The entity factory

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value as JsonValue;
use testbase_core::Attributes;
use testbase_database::{EntityStore, HandleError, StoreError};
use thiserror::Error;
use tracing::debug;

use crate::registry::{BuilderOutput, FactoryRegistry};

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("builder not found: {0}")]
    BuilderNotFound(String),
    #[error("seed not found: {0}")]
    SeedNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error(transparent)]
    Failure(#[from] anyhow::Error),
}

/// Attributes for an `insert_many` batch: absent, shared across every
/// insert, or computed per zero-based index.
pub enum BatchAttrs {
    None,
    Shared(Attributes),
    Indexed(Box<dyn Fn(usize) -> Attributes + Send + Sync>),
}

impl BatchAttrs {
    pub fn shared(attrs: Attributes) -> Self {
        BatchAttrs::Shared(attrs)
    }

    pub fn indexed<F>(f: F) -> Self
    where
        F: Fn(usize) -> Attributes + Send + Sync + 'static,
    {
        BatchAttrs::Indexed(Box::new(f))
    }

    fn for_index(&self, index: usize) -> Option<Attributes> {
        match self {
            BatchAttrs::None => None,
            BatchAttrs::Shared(attrs) => Some(attrs.clone()),
            BatchAttrs::Indexed(f) => Some(f(index)),
        }
    }
}

/// A registry bound to one store for the duration of one test.
///
/// Instances are single-use per test and must not be cached across tests;
/// recursive builder calls go through the same instance so dependency rows
/// share the test's transaction.
pub struct EntityFactory<S: EntityStore> {
    registry: Arc<FactoryRegistry<S>>,
    store: Arc<S>,
}

impl<S: EntityStore> Clone for EntityFactory<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntityStore> EntityFactory<S> {
    pub fn new(registry: Arc<FactoryRegistry<S>>, store: Arc<S>) -> Self {
        Self { registry, store }
    }

    /// The store this factory is bound to.
    pub fn connection(&self) -> &Arc<S> {
        &self.store
    }

    /// Build and insert one entity via the named builder.
    ///
    /// Fails with [`FactoryError::BuilderNotFound`] naming the missing
    /// builder when `name` is unregistered. A builder returning a deferred
    /// payload has the insertion performed here, against the bound store.
    pub async fn insert(
        &self,
        name: &str,
        attrs: Option<Attributes>,
    ) -> Result<JsonValue, FactoryError> {
        let builder = self
            .registry
            .get_builder(name)
            .ok_or_else(|| FactoryError::BuilderNotFound(name.to_owned()))?
            .clone();

        debug!("Building entity: {}", name);
        let output = builder(
            attrs.unwrap_or_default(),
            self.clone(),
            Arc::clone(&self.store),
        )
        .await?;

        match output {
            BuilderOutput::Entity(entity) => Ok(entity),
            BuilderOutput::Deferred(deferred) => {
                debug!("Performing deferred insert into {}", deferred.table);
                Ok(self.store.insert_row(&deferred.table, &deferred.values).await?)
            }
        }
    }

    /// Call [`insert`](Self::insert) exactly `count` times, concurrently,
    /// and return the results in index order.
    ///
    /// Fail-fast: the first failing insert aborts collection of the others.
    /// The inserts share one transaction handle, so their statements are
    /// serialized by it; the relative ordering of rows auto-created by
    /// recursive builders across concurrent inserts is not guaranteed.
    pub async fn insert_many(
        &self,
        count: usize,
        name: &str,
        attrs: BatchAttrs,
    ) -> Result<Vec<JsonValue>, FactoryError> {
        debug!("Building {} entities: {}", count, name);
        let inserts = (0..count).map(|index| self.insert(name, attrs.for_index(index)));
        try_join_all(inserts).await
    }

    /// Run the named seed, a composition of builder calls returning a
    /// higher-level construct.
    ///
    /// Fails with [`FactoryError::SeedNotFound`] naming the missing seed
    /// when `name` is unregistered.
    pub async fn seed(
        &self,
        name: &str,
        attrs: Option<Attributes>,
    ) -> Result<JsonValue, FactoryError> {
        let seed = self
            .registry
            .get_seed(name)
            .ok_or_else(|| FactoryError::SeedNotFound(name.to_owned()))?
            .clone();

        debug!("Running seed: {}", name);
        seed(
            attrs.unwrap_or_default(),
            self.clone(),
            Arc::clone(&self.store),
        )
        .await
    }
}
