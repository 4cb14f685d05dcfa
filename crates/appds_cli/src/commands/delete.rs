//! Delete command implementation.

use super::{CliResult, StoreOptions};
use appds_core::DataStore;

/// Runs the delete command. Deleting a missing key succeeds.
pub fn run(options: &StoreOptions, name: &str) -> CliResult<()> {
    let store = options.open()?;
    store.delete(name)?;
    Ok(())
}
