//! Declarative test-data factories
//!
//! A [`FactoryRegistry`] maps names to builder and seed functions; an
//! [`EntityFactory`] binds a registry to one store (typically the test's
//! transaction handle) and turns declarative definitions into inserted rows,
//! including recursive on-demand creation of dependencies.

mod factory;
mod registry;

pub use factory::{BatchAttrs, EntityFactory, FactoryError};
pub use registry::{BuilderFn, BuilderOutput, DeferredInsert, FactoryRegistry, SeedFn};
