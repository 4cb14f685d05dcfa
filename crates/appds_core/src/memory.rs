//! Process-local datastore.

use crate::error::{StoreError, StoreResult};
use crate::expiry::{self, ExpiryTable};
use crate::names::{filter_prefix, validate_dot_name};
use crate::store::{DataStore, SweepReport};
use appds_codec::Codec;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// A datastore held in this process's memory.
///
/// Same contract as [`SharedMemStore`](crate::SharedMemStore) without the
/// sharing: useful for tests and for code that only needs a store in one
/// process. Keys are listed in sorted order.
///
/// # Example
///
/// ```rust
/// use appds_core::{DataStoreExt, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("greeting", "hello").unwrap();
/// assert_eq!(store.get::<String>("greeting").unwrap().as_deref(), Some("hello"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    codec: Codec,
    dot_names: bool,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    data: BTreeMap<String, Vec<u8>>,
    expiry: ExpiryTable,
}

impl Inner {
    fn sweep(&mut self) -> SweepReport {
        let expired = expiry::expired_keys(&self.expiry, expiry::now_millis());
        for name in &expired {
            debug!(key = %name, "expiring entry");
            self.data.remove(name);
            self.expiry.remove(name);
        }
        SweepReport {
            expired,
            failed: Vec::new(),
        }
    }
}

impl MemoryStore {
    /// Creates an empty store with a plain codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Enables or disables dot-name validation.
    #[must_use]
    pub fn with_dot_names(mut self, dot_names: bool) -> Self {
        self.dot_names = dot_names;
        self
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut inner = self.inner.write();
        inner.sweep();
        inner.data.len()
    }

    /// Returns `true` if the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataStore for MemoryStore {
    fn codec(&self) -> &Codec {
        &self.codec
    }

    fn dot_names(&self) -> bool {
        self.dot_names
    }

    fn has(&self, name: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        inner.sweep();
        Ok(inner.data.contains_key(name))
    }

    fn get_raw(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut inner = self.inner.write();
        inner.sweep();
        Ok(inner.data.get(name).cloned())
    }

    fn set_raw(&self, name: &str, frame: &[u8], ttl: Duration) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::invalid_argument("key name cannot be empty"));
        }

        let mut inner = self.inner.write();
        inner.sweep();
        if self.dot_names {
            validate_dot_name(inner.data.keys(), name)?;
        }

        inner.data.insert(name.to_string(), frame.to_vec());
        if ttl.is_zero() {
            inner.expiry.remove(name);
        } else {
            inner
                .expiry
                .insert(name.to_string(), expiry::deadline(ttl));
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.data.remove(name);
        inner.expiry.remove(name);
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut inner = self.inner.write();
        inner.sweep();
        Ok(filter_prefix(inner.data.keys().map(String::as_str), prefix))
    }

    fn maintenance(&self) -> StoreResult<SweepReport> {
        Ok(self.inner.write().sweep())
    }
}
