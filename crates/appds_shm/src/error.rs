//! Error types for shared-memory operations.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for shared-memory operations.
pub type ShmResult<T> = Result<T, ShmError>;

/// Errors that can occur on segments, locks and shared items.
#[derive(Debug, Error)]
pub enum ShmError {
    /// A name, capacity or timing argument is malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// The handle holds no segment, or the named segment does not exist.
    #[error("shared memory segment not found: {name}")]
    NotFound {
        /// Segment name.
        name: String,
    },

    /// The handle already holds a segment.
    #[error("shared memory segment already open: {name}")]
    AlreadyOpen {
        /// Segment name.
        name: String,
    },

    /// The payload does not fit into the fixed segment capacity.
    #[error("value of {len} bytes is too large for segment capacity {capacity}")]
    ValueTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Capacity of the segment.
        capacity: usize,
    },

    /// The lock could not be acquired within the wait budget.
    #[error("timed out after {waited:?} waiting for lock {name}")]
    LockTimeout {
        /// Lock name.
        name: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// This handle already holds the lock.
    #[error("lock already held by this handle: {name}")]
    AlreadyHeld {
        /// Lock name.
        name: String,
    },

    /// This handle does not hold the lock it tried to release.
    #[error("lock not held by this handle: {name}")]
    NotHeld {
        /// Lock name.
        name: String,
    },

    /// The handle's lock bookkeeping does not match its lock name.
    #[error("invalid lock state for {name}")]
    InvalidLock {
        /// Lock name.
        name: String,
    },

    /// An OS-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShmError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Returns `true` for [`ShmError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`ShmError::LockTimeout`].
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
