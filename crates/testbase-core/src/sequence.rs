//! Named monotonic counters for collision-free test values
//!
//! A `SequenceRegistry` hands out deterministic, strictly increasing
//! integers per named counter. It is the only intentionally shared mutable
//! state in the harness: one registry per test run, shared via `Arc`, reset
//! with `reset_all` between independent runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Counter name used when no explicit sequence is requested.
pub const DEFAULT_SEQUENCE: &str = "default";

const IDENTIFIER_PREFIX: &str = "io.testbase";

/// Process-wide named counters producing gapless, strictly increasing values.
///
/// All operations are total: they never fail and never suspend.
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    counters: Mutex<HashMap<String, u64>>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the named counter incremented by one, creating it at zero on
    /// first use. For a given name the returned values are `1, 2, 3, ...`
    /// with no gaps or repeats.
    pub fn next(&self, name: &str) -> u64 {
        let mut counters = self.lock();
        let counter = counters.entry(name.to_owned()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Set the named counter to `value`; subsequent `next` calls continue
    /// from `value + 1`. Creates the counter if absent.
    pub fn reset(&self, name: &str, value: u64) {
        self.lock().insert(name.to_owned(), value);
    }

    /// Clear every counter. Used between independent test runs to keep
    /// generated values deterministic.
    pub fn reset_all(&self) {
        self.lock().clear();
    }

    /// Build a reverse-DNS-style unique identifier.
    ///
    /// With a suffix the identifier is `io.testbase.<suffix>.<n>` where `n`
    /// is the suffix's own sequence; without one, a generated fragment and
    /// the default sequence are used instead.
    pub fn unique_identifier(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}.{}.{}", IDENTIFIER_PREFIX, suffix, self.next(suffix)),
            None => {
                let generated = Uuid::new_v4().simple().to_string();
                format!(
                    "{}.{}.{}",
                    IDENTIFIER_PREFIX,
                    &generated[..8],
                    self.next(DEFAULT_SEQUENCE)
                )
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        // A poisoned lock still holds a usable map.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn sequences_are_monotonic_and_gapless() {
        let sequences = SequenceRegistry::new();
        let values: Vec<u64> = (0..100).map(|_| sequences.next("k")).collect();
        let expected: Vec<u64> = (1..=100).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn sequences_are_independent_per_name() {
        let sequences = SequenceRegistry::new();
        sequences.next("a");
        sequences.next("a");
        sequences.next("a");
        assert_eq!(sequences.next("b"), 1);
    }

    #[test]
    fn reset_continues_from_value_plus_one() {
        let sequences = SequenceRegistry::new();
        sequences.next("users");
        sequences.reset("users", 10);
        assert_eq!(sequences.next("users"), 11);
    }

    #[test]
    fn reset_all_clears_every_counter() {
        let sequences = SequenceRegistry::new();
        sequences.next("a");
        sequences.next("b");
        sequences.reset_all();
        assert_eq!(sequences.next("a"), 1);
        assert_eq!(sequences.next("b"), 1);
    }

    #[test]
    fn unique_identifiers_do_not_collide() {
        let sequences = Arc::new(SequenceRegistry::new());
        let first = sequences.unique_identifier(Some("widget"));
        let second = sequences.unique_identifier(Some("widget"));
        assert_eq!(first, "io.testbase.widget.1");
        assert_eq!(second, "io.testbase.widget.2");
        assert_ne!(first, second);
    }

    #[test]
    fn unique_identifier_without_suffix_uses_generated_fragment() {
        let sequences = SequenceRegistry::new();
        let identifier = sequences.unique_identifier(None);
        assert!(identifier.starts_with("io.testbase."));
        assert!(identifier.ends_with(".1"));
    }
}
