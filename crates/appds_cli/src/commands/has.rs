//! Has command implementation.

use super::{CliResult, StoreOptions};
use appds_core::DataStore;

/// Runs the has command.
pub fn run(options: &StoreOptions, name: &str) -> CliResult<()> {
    let store = options.open()?;
    println!("{}", store.has(name)?);
    Ok(())
}
