//! JSON export of a whole store.

use crate::error::StoreResult;
use crate::names::NAME_SEPARATOR;
use crate::store::DataStore;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

/// Renders every live key of `store` as a JSON object.
///
/// With dot names enabled, `"a.b"` becomes `{"a": {"b": ...}}`; otherwise
/// the object is flat. Values that cannot be rendered (sealed frames the
/// codec cannot open, maps with non-string keys) become `null`.
pub fn to_json<S: DataStore + ?Sized>(store: &S) -> StoreResult<JsonValue> {
    let mut names = store.list("")?;
    names.sort();

    let mut root = Map::new();
    for name in names {
        let Some(frame) = store.get_raw(&name)? else {
            debug!(key = %name, "key vanished during export");
            continue;
        };
        let value = render(store, &name, &frame);
        if store.dot_names() {
            insert_nested(&mut root, &name, value);
        } else {
            root.insert(name, value);
        }
    }
    Ok(JsonValue::Object(root))
}

fn render<S: DataStore + ?Sized>(store: &S, name: &str, frame: &[u8]) -> JsonValue {
    let value = match store.codec().decode_value(name, frame) {
        Ok(value) => value,
        Err(e) => {
            debug!(key = %name, error = %e, "exporting undecodable value as null");
            return JsonValue::Null;
        }
    };
    serde_json::to_value(&value).unwrap_or_else(|e| {
        debug!(key = %name, error = %e, "exporting non-JSON value as null");
        JsonValue::Null
    })
}

fn insert_nested(root: &mut Map<String, JsonValue>, name: &str, value: JsonValue) {
    let (parents, leaf) = match name.rsplit_once(NAME_SEPARATOR) {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, name),
    };

    let mut level = root;
    for part in parents.into_iter().flat_map(|p| p.split(NAME_SEPARATOR)) {
        let entry = level
            .entry(part.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        level = match entry {
            JsonValue::Object(map) => map,
            _ => {
                warn!(key = %name, "key nests under a value; skipped in export");
                return;
            }
        };
    }
    if level.get(leaf).is_some_and(JsonValue::is_object) {
        warn!(key = %name, "key has nested keys; skipped in export");
        return;
    }
    level.insert(leaf.to_string(), value);
}
