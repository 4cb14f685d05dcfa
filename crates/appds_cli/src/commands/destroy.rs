//! Destroy command implementation.

use super::{CliResult, StoreOptions};
use appds_core::Ownership;

/// Runs the destroy command.
pub fn run(options: &StoreOptions) -> CliResult<()> {
    let store = options.open_as(Ownership::Always)?;
    let keys = store.keys()?.len();
    store.cleanup()?;
    println!("destroyed {} ({keys} keys)", options.name);
    Ok(())
}
