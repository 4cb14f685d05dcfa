//! Shared-memory configuration.

use crate::error::{ShmError, ShmResult};
use crate::limits::default_shm_dir;
use std::path::PathBuf;
use std::time::Duration;

/// Default pause between lock creation attempts.
pub const DEFAULT_LOCK_RETRY: Duration = Duration::from_millis(200);

/// Default total time to wait for a lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Where segments live and how long to wait for their locks.
#[derive(Debug, Clone)]
pub struct ShmConfig {
    /// Directory holding the segment and lock objects.
    ///
    /// Every process sharing items must use the same directory.
    pub dir: PathBuf,

    /// Pause between lock creation attempts.
    pub lock_retry: Duration,

    /// Total time to wait for a lock before failing with `LockTimeout`.
    pub lock_timeout: Duration,
}

impl Default for ShmConfig {
    fn default() -> Self {
        Self {
            dir: default_shm_dir(),
            lock_retry: DEFAULT_LOCK_RETRY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl ShmConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the segment directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Sets the pause between lock attempts.
    #[must_use]
    pub const fn lock_retry(mut self, retry: Duration) -> Self {
        self.lock_retry = retry;
        self
    }

    /// Sets the lock wait budget.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Checks the configuration before any resource is touched.
    pub fn validate(&self) -> ShmResult<()> {
        if self.lock_retry.is_zero() {
            return Err(ShmError::invalid_argument(
                "lock retry interval must be greater than zero",
            ));
        }
        if self.dir.as_os_str().is_empty() {
            return Err(ShmError::invalid_argument(
                "shared memory directory cannot be empty",
            ));
        }
        Ok(())
    }
}
