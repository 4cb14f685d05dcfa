//! Export command implementation.

use super::{CliResult, StoreOptions};
use appds_core::DataStoreExt;

/// Runs the export command.
pub fn run(options: &StoreOptions, compact: bool) -> CliResult<()> {
    let store = options.open()?;
    let json = store.export_json()?;
    let text = if compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{text}");
    Ok(())
}
