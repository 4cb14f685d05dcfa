//! Unlock command implementation.

use super::{CliResult, StoreOptions};
use appds_core::Ownership;
use appds_shm::NamedMutex;

/// Runs the unlock command.
///
/// Only for locks whose holder is known to be gone; breaking a live lock
/// lets two writers interleave.
pub fn run(options: &StoreOptions, item: &str) -> CliResult<()> {
    let config = options.config(Ownership::Never);
    let mutex = NamedMutex::new(&config.shm.dir, item, config.shm.lock_retry)?;
    if mutex.break_lock()? {
        println!("unlocked {item}");
    } else {
        println!("not locked {item}");
    }
    Ok(())
}
