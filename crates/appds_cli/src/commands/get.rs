//! Get command implementation.

use super::{CliError, CliResult, StoreOptions};
use appds_core::DataStoreExt;
use serde_json::Value;

/// Runs the get command.
pub fn run(options: &StoreOptions, name: &str) -> CliResult<()> {
    let store = options.open()?;
    let value: Value = store
        .get(name)?
        .ok_or_else(|| CliError::NotFound(name.to_string()))?;
    println!("{}", serde_json::to_string(&value)?);
    Ok(())
}
