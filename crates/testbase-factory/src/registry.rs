//! Builder and seed registration

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use testbase_core::Attributes;
use testbase_database::EntityStore;

use crate::factory::{EntityFactory, FactoryError};

/// Insertion a builder delegates back to the factory: the target table and
/// the row to insert.
#[derive(Clone, Debug)]
pub struct DeferredInsert {
    pub table: String,
    pub values: Attributes,
}

impl DeferredInsert {
    pub fn new(table: impl Into<String>, values: Attributes) -> Self {
        Self {
            table: table.into(),
            values,
        }
    }
}

/// What a builder hands back: either a row it already stored itself, or a
/// deferred payload the factory inserts on its behalf.
#[derive(Debug)]
pub enum BuilderOutput {
    Entity(JsonValue),
    Deferred(DeferredInsert),
}

impl From<DeferredInsert> for BuilderOutput {
    fn from(insert: DeferredInsert) -> Self {
        BuilderOutput::Deferred(insert)
    }
}

impl From<JsonValue> for BuilderOutput {
    fn from(entity: JsonValue) -> Self {
        BuilderOutput::Entity(entity)
    }
}

/// Single-entity constructor. Receives the caller's attribute overrides, the
/// factory (for recursive dependency creation) and the bound store.
pub type BuilderFn<S> = Arc<
    dyn Fn(Attributes, EntityFactory<S>, Arc<S>) -> BoxFuture<'static, Result<BuilderOutput, FactoryError>>
        + Send
        + Sync,
>;

/// Multi-entity composition returning a higher-level construct.
pub type SeedFn<S> = Arc<
    dyn Fn(Attributes, EntityFactory<S>, Arc<S>) -> BoxFuture<'static, Result<JsonValue, FactoryError>>
        + Send
        + Sync,
>;

/// Immutable name→function maps, populated once at construction time.
pub struct FactoryRegistry<S: EntityStore> {
    builders: HashMap<String, BuilderFn<S>>,
    seeds: HashMap<String, SeedFn<S>>,
}

impl<S: EntityStore> FactoryRegistry<S> {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
            seeds: HashMap::new(),
        }
    }

    /// Register a builder under `name`. Later registrations replace earlier
    /// ones of the same name.
    pub fn builder<F>(mut self, name: impl Into<String>, builder: F) -> Self
    where
        F: Fn(Attributes, EntityFactory<S>, Arc<S>) -> BoxFuture<'static, Result<BuilderOutput, FactoryError>>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(name.into(), Arc::new(builder));
        self
    }

    /// Register a seed under `name`.
    pub fn seed<F>(mut self, name: impl Into<String>, seed: F) -> Self
    where
        F: Fn(Attributes, EntityFactory<S>, Arc<S>) -> BoxFuture<'static, Result<JsonValue, FactoryError>>
            + Send
            + Sync
            + 'static,
    {
        self.seeds.insert(name.into(), Arc::new(seed));
        self
    }

    pub(crate) fn get_builder(&self, name: &str) -> Option<&BuilderFn<S>> {
        self.builders.get(name)
    }

    pub(crate) fn get_seed(&self, name: &str) -> Option<&SeedFn<S>> {
        self.seeds.get(name)
    }
}

impl<S: EntityStore> Default for FactoryRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
