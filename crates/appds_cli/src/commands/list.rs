//! List command implementation.

use super::{CliResult, StoreOptions};
use appds_core::DataStore;

/// Runs the list command.
pub fn run(options: &StoreOptions, prefix: &str) -> CliResult<()> {
    let store = options.open()?;
    for name in store.list(prefix)? {
        println!("{name}");
    }
    Ok(())
}
