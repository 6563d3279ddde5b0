//! Core types and utilities shared across all Testbase crates

pub mod resources;
pub mod sequence;
pub mod types;

// Re-export commonly used types
pub use resources::{env_var_for, resolve};
pub use sequence::{SequenceRegistry, DEFAULT_SEQUENCE};
pub use types::{attrs, merge_attributes, Attributes};

// Re-export external dependencies
pub use anyhow;
pub use serde_json;
