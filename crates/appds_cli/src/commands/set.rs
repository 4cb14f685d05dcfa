//! Set command implementation.

use super::{CliResult, StoreOptions};
use appds_core::{DataStoreExt, SetOptions};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Parses a command-line value: JSON if it parses, a bare string otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| {
        debug!(value = %raw, "not JSON; storing as a string");
        Value::String(raw.to_string())
    })
}

/// Runs the set command.
pub fn run(
    options: &StoreOptions,
    name: &str,
    raw: &str,
    ttl: Duration,
    encrypt: bool,
) -> CliResult<()> {
    let store = options.open()?;
    let value = parse_value(raw);
    store.set_with(name, &value, SetOptions::new().ttl(ttl).encrypt(encrypt))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_or_falls_back_to_string() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"a":[1,true]}"#), json!({"a": [1, true]}));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
        assert_eq!(parse_value("plain words"), json!("plain words"));
    }
}
