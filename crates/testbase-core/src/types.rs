//! Attribute maps used by builders, seeds and stores

use serde_json::{Map, Value};

/// Plain key/value attribute map with no required shape beyond what a
/// given builder expects.
pub type Attributes = Map<String, Value>;

/// Convert a JSON value into an attribute map.
///
/// Anything other than a JSON object yields an empty map; builders treat
/// "no attributes" and "empty attributes" identically.
pub fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => Attributes::new(),
    }
}

/// Merge caller overrides into builder-computed defaults.
///
/// Overrides always take precedence when both sides specify the same field.
pub fn merge_attributes(mut defaults: Attributes, overrides: &Attributes) -> Attributes {
    for (key, value) in overrides {
        defaults.insert(key.clone(), value.clone());
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let defaults = attrs(json!({"name": "Default", "email": "a@example.com"}));
        let overrides = attrs(json!({"name": "Override"}));

        let merged = merge_attributes(defaults, &overrides);

        assert_eq!(merged.get("name"), Some(&json!("Override")));
        assert_eq!(merged.get("email"), Some(&json!("a@example.com")));
    }

    #[test]
    fn non_object_values_become_empty_attributes() {
        assert!(attrs(json!("just a string")).is_empty());
        assert!(attrs(json!(42)).is_empty());
        assert!(attrs(json!(null)).is_empty());
    }
}
