//! Error types for datastore operations.

use appds_codec::CodecError;
use appds_shm::ShmError;
use thiserror::Error;

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in datastore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Shared-memory error (segment, lock or capacity).
    #[error("shared memory error: {0}")]
    Shm(#[from] ShmError),

    /// Encoding, decoding or encryption error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Malformed name, capacity or configuration.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// The name conflicts with an existing key or a reserved name.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The index or expiry table does not decode to the expected shape.
    #[error("{what} is corrupt: {message}")]
    CorruptState {
        /// Which structure is corrupt.
        what: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The store has been cleaned up.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a corrupt state error.
    pub fn corrupt(what: &'static str, source: &CodecError) -> Self {
        Self::CorruptState {
            what,
            message: source.to_string(),
        }
    }

    /// Returns `true` if a shared-memory lock could not be acquired in time.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::Shm(e) if e.is_lock_timeout())
    }

    /// Returns `true` if a value did not fit its segment.
    #[must_use]
    pub fn is_value_too_large(&self) -> bool {
        matches!(self, Self::Shm(ShmError::ValueTooLarge { .. }))
    }

    /// Lifts shared-memory argument errors into [`StoreError::InvalidArgument`].
    pub(crate) fn from_shm_argument(error: ShmError) -> Self {
        match error {
            ShmError::InvalidArgument { message } => Self::InvalidArgument { message },
            other => Self::Shm(other),
        }
    }
}
