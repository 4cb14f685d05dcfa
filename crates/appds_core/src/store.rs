//! Datastore trait definitions.

use crate::error::StoreResult;
use crate::export;
use appds_codec::Codec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// A key/value store of encoded frames.
///
/// Stores hold **opaque frames** produced by their [`Codec`]. Typed access
/// lives in [`DataStoreExt`], which every store gets for free.
///
/// # Invariants
///
/// - Expired keys are never observable: `has`, `get_raw` and `list` sweep
///   before answering
/// - With [`dot_names`](Self::dot_names) set, no key is nested under another
/// - Every method takes `&self`; stores are `Send + Sync`
///
/// # Implementors
///
/// - [`super::MemoryStore`] - process-local, for tests and single-process use
/// - [`super::SharedMemStore`] - shared across processes on one host
pub trait DataStore: Send + Sync {
    /// Codec used to encode and decode values.
    fn codec(&self) -> &Codec;

    /// Whether dot-name validation is enabled.
    fn dot_names(&self) -> bool;

    /// Returns `true` if `name` is present and not expired.
    fn has(&self, name: &str) -> StoreResult<bool>;

    /// Returns the stored frame for `name`, or `None` if absent.
    ///
    /// The frame may carry trailing zero padding.
    fn get_raw(&self, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stores `frame` under `name`.
    ///
    /// A non-zero `ttl` schedules the key for expiry; a zero `ttl` makes it
    /// permanent, replacing any earlier expiry.
    ///
    /// A sealed frame only decodes under the name it was encoded for.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `name` is malformed or reserved
    /// - dot names are enabled and `name` nests under or above a key
    /// - the frame does not fit the key's existing segment
    fn set_raw(&self, name: &str, frame: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Removes `name`. Removing an absent key is not an error.
    fn delete(&self, name: &str) -> StoreResult<()>;

    /// Returns the live keys starting with `prefix`.
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Removes every expired key.
    fn maintenance(&self) -> StoreResult<SweepReport>;
}

/// Options for [`DataStoreExt::set_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Lifetime of the entry; zero means no expiry.
    pub ttl: Duration,
    /// Seal the value with the store codec's key.
    pub encrypt: bool,
}

impl SetOptions {
    /// Plain, permanent entry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ttl: Duration::ZERO,
            encrypt: false,
        }
    }

    /// Sets the entry lifetime.
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets whether the value is sealed.
    #[must_use]
    pub const fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }
}

/// Outcome of an expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys removed by this sweep.
    pub expired: Vec<String>,
    /// Expired keys whose removal failed; they are retried next sweep.
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An expired key that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    /// The key.
    pub name: String,
    /// Why removal failed.
    pub error: String,
}

/// Typed access on top of [`DataStore`].
pub trait DataStoreExt: DataStore {
    /// Decodes the value of `name`, or `None` if absent.
    fn get<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        match self.get_raw(name)? {
            Some(frame) => Ok(Some(self.codec().decode(name, &frame)?)),
            None => Ok(None),
        }
    }

    /// Decodes the value of `name`, or returns `default` if absent.
    fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> StoreResult<T> {
        Ok(self.get(name)?.unwrap_or(default))
    }

    /// Stores a plain, permanent value.
    fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> StoreResult<()> {
        self.set_with(name, value, SetOptions::new())
    }

    /// Stores a value with a lifetime and/or sealing.
    fn set_with<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        options: SetOptions,
    ) -> StoreResult<()> {
        let frame = self.codec().encode(name, value, options.encrypt)?;
        self.set_raw(name, &frame, options.ttl)
    }

    /// Renders every live key as JSON; see [`export::to_json`].
    fn export_json(&self) -> StoreResult<serde_json::Value> {
        export::to_json(self)
    }
}

impl<S: DataStore + ?Sized> DataStoreExt for S {}
