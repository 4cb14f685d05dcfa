//! Sweep command implementation.

use super::{CliResult, StoreOptions};
use appds_core::DataStore;

/// Runs the sweep command.
pub fn run(options: &StoreOptions) -> CliResult<()> {
    let store = options.open()?;
    let report = store.maintenance()?;
    for name in &report.expired {
        println!("expired {name}");
    }
    for failure in &report.failed {
        println!("failed {} ({})", failure.name, failure.error);
    }
    Ok(())
}
