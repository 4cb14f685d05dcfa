//! Dot-separated key names.
//!
//! With dot names enabled a key is a path: `"server.port"` lives under
//! `"server"`. A store then cannot hold both a key and anything nested
//! under it, because the nested form of the data would be ambiguous.

use crate::error::{StoreError, StoreResult};

/// Separator between the segments of a dot name.
pub const NAME_SEPARATOR: char = '.';

/// Returns `true` if `a` and `b` would nest under one another.
///
/// Equal names do not conflict; rewriting a key is always allowed.
#[must_use]
pub fn conflicts(a: &str, b: &str) -> bool {
    is_nested_under(a, b) || is_nested_under(b, a)
}

fn is_nested_under(child: &str, parent: &str) -> bool {
    child.len() > parent.len()
        && child.starts_with(parent)
        && child[parent.len()..].starts_with(NAME_SEPARATOR)
}

/// Checks that `name` can be added next to `existing` keys.
///
/// # Errors
///
/// `InvalidName` naming the first existing key that `name` would nest
/// under or above.
pub fn validate_dot_name<I, S>(existing: I, name: &str) -> StoreResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match existing.into_iter().find(|key| conflicts(key.as_ref(), name)) {
        Some(key) => Err(StoreError::invalid_name(
            name,
            format!("conflicts with existing key {:?}", key.as_ref()),
        )),
        None => Ok(()),
    }
}

/// Returns the keys starting with `prefix`, in input order.
#[must_use]
pub fn filter_prefix<I, S>(keys: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String> + AsRef<str>,
{
    keys.into_iter()
        .filter(|key| key.as_ref().starts_with(prefix))
        .map(Into::into)
        .collect()
}
