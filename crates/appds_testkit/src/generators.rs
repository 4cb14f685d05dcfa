//! Property-based test generators using proptest.
//!
//! Provides strategies for generating names and values that respect the
//! store's naming limits.

use appds_core::MAX_STORE_NAME_LENGTH;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for generating valid flat key names.
pub fn key_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_]{1,13}").expect("Invalid regex")
}

/// Strategy for generating dot names of up to three segments.
///
/// Segments draw from a tiny alphabet so that generated sets often
/// contain nesting conflicts.
pub fn dot_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-c]{1,2}(\\.[a-c]{1,2}){0,2}").expect("Invalid regex")
}

/// Strategy for generating valid store names.
pub fn store_name_strategy() -> impl Strategy<Value = String> {
    let pattern = format!("[a-zA-Z][a-zA-Z0-9_]{{0,{}}}", MAX_STORE_NAME_LENGTH - 1);
    prop::string::string_regex(&pattern).expect("Invalid regex")
}

/// Strategy for generating JSON-representable values.
///
/// Floats are left out so that values compare exactly after a round trip.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[ -~]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use appds_core::names::NAME_SEPARATOR;

    proptest! {
        #[test]
        fn key_names_fit(name in key_name_strategy()) {
            prop_assert!(!name.is_empty() && name.len() <= 13);
        }

        #[test]
        fn dot_names_fit(name in dot_name_strategy()) {
            prop_assert!(name.len() <= 8);
            prop_assert!(!name.starts_with(NAME_SEPARATOR));
        }

        #[test]
        fn store_names_fit(name in store_name_strategy()) {
            prop_assert!(name.len() <= MAX_STORE_NAME_LENGTH);
        }
    }
}
