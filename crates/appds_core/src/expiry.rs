//! Expiry instants.
//!
//! Instants are wall-clock milliseconds since the Unix epoch so that every
//! process on the host reads the same table the same way.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key name to expiry instant in epoch milliseconds.
pub type ExpiryTable = BTreeMap<String, u64>;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Instant at which an entry written now with `ttl` expires.
///
/// Sub-millisecond lifetimes round up to one millisecond.
#[must_use]
pub fn deadline(ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
    now_millis().saturating_add(ttl_ms)
}

/// An entry is expired once its instant is not in the future.
#[must_use]
pub const fn is_expired(instant: u64, now: u64) -> bool {
    instant <= now
}

/// Keys in `table` that are expired at `now`.
#[must_use]
pub fn expired_keys(table: &ExpiryTable, now: u64) -> Vec<String> {
    table
        .iter()
        .filter(|(_, instant)| is_expired(**instant, now))
        .map(|(name, _)| name.clone())
        .collect()
}
