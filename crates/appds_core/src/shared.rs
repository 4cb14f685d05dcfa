//! Datastore shared between processes through named shared memory.

use crate::config::{Ownership, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::expiry::{self, ExpiryTable};
use crate::names::{filter_prefix, validate_dot_name};
use crate::store::{DataStore, SweepFailure, SweepReport};
use appds_codec::{is_blank, Codec};
use appds_shm::limits::validate_item_name;
use appds_shm::{Opened, SharedItem};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A key/value store visible to every process on the host that opens it
/// with the same name and directory.
///
/// Three kinds of shared item make up a store:
///
/// - the **index** (`<name>I`): every key, in insertion order
/// - the **expiry table** (`<name>E`): key to expiry instant
/// - one item per key holding that key's frame
///
/// Each item is updated under its own lock; no operation holds two locks
/// at once. A multi-item operation is therefore not atomic as a whole: a
/// reader may see a key in the index whose value is not written yet (it
/// reads as absent), or an expired key before the next sweep removes it.
///
/// # Example
///
/// ```no_run
/// use appds_core::{DataStoreExt, SharedMemStore, StoreConfig};
///
/// let store = SharedMemStore::open(StoreConfig::new().name("app"))?;
/// store.set("server.port", &8080u16)?;
/// assert_eq!(store.get::<u16>("server.port")?, Some(8080));
/// # Ok::<(), appds_core::StoreError>(())
/// ```
#[derive(Debug)]
pub struct SharedMemStore {
    config: StoreConfig,
    codec: Codec,
    index_name: String,
    expiry_name: String,
    index: Mutex<SharedItem>,
    expiry: Mutex<SharedItem>,
    owner: bool,
    closed: AtomicBool,
}

impl SharedMemStore {
    /// Opens the store with a plain codec.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        Self::open_with_codec(config, Codec::new())
    }

    /// Opens the store, creating its index and expiry table if needed.
    ///
    /// Attaching to a live store never resets its contents; the empty
    /// index and table are written only into freshly created segments.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the configuration is invalid
    /// - `encrypt_index` is set but `codec` has no key
    /// - `index_capacity` cannot hold even an empty index
    /// - a segment cannot be created or attached
    ///
    /// A failed open removes any segment it created itself.
    pub fn open_with_codec(config: StoreConfig, codec: Codec) -> StoreResult<Self> {
        config.validate()?;
        if config.encrypt_index && !codec.can_encrypt() {
            return Err(StoreError::invalid_argument(
                "an encrypted index needs a codec with a key",
            ));
        }

        let index_name = config.index_name();
        let expiry_name = config.expiry_name();

        let empty_index = codec.encode(&index_name, &Vec::<String>::new(), config.encrypt_index)?;
        let empty_expiry = codec.encode(&expiry_name, &ExpiryTable::new(), config.encrypt_index)?;
        let needed = empty_index.len().max(empty_expiry.len());
        if needed > config.index_capacity {
            return Err(StoreError::invalid_argument(format!(
                "index capacity {} is below the {needed} bytes of an empty index",
                config.index_capacity
            )));
        }

        let mut index = open_table(&index_name, &config, &empty_index)?;
        let expiry = match open_table(&expiry_name, &config, &empty_expiry) {
            Ok(expiry) => expiry,
            Err(e) => {
                discard_created(&mut index);
                return Err(e);
            }
        };

        let created = index.opened() == Opened::Created;
        let owner = match config.ownership {
            Ownership::Creator => created,
            Ownership::Always => true,
            Ownership::Never => false,
        };

        info!(
            store = %config.name,
            dir = %config.shm.dir.display(),
            created,
            owner,
            "opened shared store"
        );

        Ok(Self {
            config,
            codec,
            index_name,
            expiry_name,
            index: Mutex::new(index),
            expiry: Mutex::new(expiry),
            owner,
            closed: AtomicBool::new(false),
        })
    }

    /// Store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether cleanup of this instance destroys the shared state.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Returns `true` once [`cleanup`](Self::cleanup) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Every key in the index, in insertion order, without sweeping.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        self.read_index()
    }

    /// Expiry table as stored, without sweeping.
    pub fn expiry_table(&self) -> StoreResult<ExpiryTable> {
        self.ensure_open()?;
        read_table(
            &self.codec,
            &self.expiry_name,
            &self.expiry.lock().get()?,
            "expiry table",
        )
    }

    /// Releases this instance's hold on the store.
    ///
    /// The owner destroys the expiry table and the index, and, when
    /// `purge_items_on_cleanup` is set, every indexed item first. Anyone
    /// else only detaches. Later calls do nothing; every other operation
    /// then fails with [`StoreError::Closed`].
    pub fn cleanup(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut index = self.index.lock();
        let mut expiry = self.expiry.lock();

        if !self.owner {
            debug!(store = %self.config.name, "detaching from shared store");
            let closed_expiry = expiry.close();
            let closed_index = index.close();
            return Ok(closed_expiry.and(closed_index)?);
        }

        info!(
            store = %self.config.name,
            purge = self.config.purge_items_on_cleanup,
            "destroying shared store"
        );

        let mut first_error: Option<StoreError> = None;
        let mut record = |result: StoreResult<()>| {
            if let Err(e) = result {
                warn!(store = %self.config.name, error = %e, "cleanup step failed");
                first_error.get_or_insert(e);
            }
        };

        if self.config.purge_items_on_cleanup {
            match index.get().map_err(StoreError::from).and_then(|payload| {
                read_table::<Vec<String>>(&self.codec, &self.index_name, &payload, "index")
            }) {
                Ok(keys) => {
                    for key in keys {
                        record(
                            SharedItem::remove(&key, &self.config.shm)
                                .map(|_| ())
                                .map_err(StoreError::from),
                        );
                    }
                }
                Err(e) => record(Err(e)),
            }
        }
        record(expiry.delete().map_err(StoreError::from));
        record(index.delete().map_err(StoreError::from));

        first_error.map_or(Ok(()), Err)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn validate_key(&self, name: &str) -> StoreResult<()> {
        validate_item_name(name).map_err(StoreError::from_shm_argument)?;
        if name == self.index_name || name == self.expiry_name {
            return Err(StoreError::invalid_name(
                name,
                "reserved for the store's own items",
            ));
        }
        Ok(())
    }

    fn read_index(&self) -> StoreResult<Vec<String>> {
        let payload = self.index.lock().get()?;
        read_table(&self.codec, &self.index_name, &payload, "index")
    }

    fn edit_index<F>(&self, edit: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Vec<String>) -> bool,
    {
        edit_table(
            &mut self.index.lock(),
            &self.codec,
            self.config.encrypt_index,
            "index",
            edit,
        )
    }

    fn edit_expiry<F>(&self, edit: F) -> StoreResult<()>
    where
        F: FnOnce(&mut ExpiryTable) -> bool,
    {
        edit_table(
            &mut self.expiry.lock(),
            &self.codec,
            self.config.encrypt_index,
            "expiry table",
            edit,
        )
    }

    fn unindex(&self, name: &str) -> StoreResult<()> {
        self.edit_index(|keys| {
            let before = keys.len();
            keys.retain(|key| key != name);
            keys.len() != before
        })
    }

    fn unexpire(&self, name: &str) -> StoreResult<()> {
        self.edit_expiry(|table| table.remove(name).is_some())
    }

    /// Destroys an expired key. All three steps are attempted.
    fn expire(&self, name: &str) -> StoreResult<()> {
        let destroyed = SharedItem::remove(name, &self.config.shm)
            .map(|_| ())
            .map_err(StoreError::from);
        let unexpired = self.unexpire(name);
        let unindexed = self.unindex(name);
        destroyed.and(unexpired).and(unindexed)
    }
}

/// Opens a table item and writes `empty` into it if it is still blank.
/// A table this call created is removed again when seeding fails.
fn open_table(name: &str, config: &StoreConfig, empty: &[u8]) -> StoreResult<SharedItem> {
    let mut item = SharedItem::open(name, config.index_capacity, &config.shm)?;
    match seed(&mut item, empty) {
        Ok(()) => Ok(item),
        Err(e) => {
            discard_created(&mut item);
            Err(e)
        }
    }
}

fn discard_created(item: &mut SharedItem) {
    if item.opened() != Opened::Created {
        return;
    }
    if let Err(e) = item.delete() {
        warn!(item = %item.name(), error = %e, "failed to remove half-created table");
    }
}

fn seed(item: &mut SharedItem, empty: &[u8]) -> StoreResult<()> {
    if item.opened() == Opened::Attached && !is_blank(&item.get()?) {
        return Ok(());
    }
    let seeded = item.update_with::<_, StoreError>(|current| {
        Ok(is_blank(current).then(|| empty.to_vec()))
    })?;
    if seeded {
        debug!(item = %item.name(), "seeded empty table");
    }
    Ok(())
}

fn read_table<T: DeserializeOwned>(
    codec: &Codec,
    item: &str,
    payload: &[u8],
    what: &'static str,
) -> StoreResult<T> {
    codec
        .decode(item, payload)
        .map_err(|e| StoreError::corrupt(what, &e))
}

/// Read-modify-write of a table under its item's lock. `edit` returns
/// whether it changed anything; unchanged tables are not rewritten.
fn edit_table<T, F>(
    item: &mut SharedItem,
    codec: &Codec,
    encrypt: bool,
    what: &'static str,
    edit: F,
) -> StoreResult<()>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T) -> bool,
{
    let name = item.name().to_string();
    item.update_with::<_, StoreError>(|current| {
        let mut table: T = read_table(codec, &name, current, what)?;
        if edit(&mut table) {
            Ok(Some(codec.encode(&name, &table, encrypt)?))
        } else {
            Ok(None)
        }
    })?;
    Ok(())
}

impl DataStore for SharedMemStore {
    fn codec(&self) -> &Codec {
        &self.codec
    }

    fn dot_names(&self) -> bool {
        self.config.dot_names
    }

    fn has(&self, name: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        self.maintenance()?;
        Ok(self.read_index()?.iter().any(|key| key == name))
    }

    fn get_raw(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        if !self.has(name)? {
            return Ok(None);
        }

        let item = match SharedItem::attach(name, &self.config.shm) {
            Ok(item) => item,
            Err(e) if e.is_not_found() => {
                debug!(key = %name, "indexed key has no segment yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let payload = item.get()?;
        if is_blank(&payload) {
            debug!(key = %name, "indexed key has no value yet");
            return Ok(None);
        }
        Ok(Some(payload))
    }

    fn set_raw(&self, name: &str, frame: &[u8], ttl: Duration) -> StoreResult<()> {
        self.ensure_open()?;
        self.validate_key(name)?;
        self.maintenance()?;

        if self.config.dot_names {
            validate_dot_name(self.read_index()?, name)?;
        }

        self.edit_index(|keys| {
            if keys.iter().any(|key| key == name) {
                false
            } else {
                keys.push(name.to_string());
                true
            }
        })?;

        let capacity = self.config.item_capacity.max(frame.len());
        let mut item = SharedItem::open(name, capacity, &self.config.shm)?;
        item.set(frame)?;
        item.close()?;

        if ttl.is_zero() {
            self.unexpire(name)?;
        } else {
            let at = expiry::deadline(ttl);
            self.edit_expiry(|table| {
                table.insert(name.to_string(), at);
                true
            })?;
        }

        debug!(key = %name, len = frame.len(), ttl_ms = ttl.as_millis(), "stored value");
        Ok(())
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        if !self.has(name)? {
            return Ok(());
        }

        SharedItem::remove(name, &self.config.shm)?;
        self.unexpire(name)?;
        self.unindex(name)?;
        debug!(key = %name, "deleted key");
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        self.maintenance()?;
        Ok(filter_prefix(self.read_index()?, prefix))
    }

    fn maintenance(&self) -> StoreResult<SweepReport> {
        self.ensure_open()?;
        let table = self.expiry_table()?;
        let mut report = SweepReport::default();
        if table.is_empty() {
            return Ok(report);
        }

        for name in expiry::expired_keys(&table, expiry::now_millis()) {
            info!(store = %self.config.name, key = %name, "expiring entry");
            match self.expire(&name) {
                Ok(()) => report.expired.push(name),
                Err(e) => {
                    warn!(store = %self.config.name, key = %name, error = %e, "failed to expire entry");
                    report.failed.push(SweepFailure {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}

impl Drop for SharedMemStore {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!(store = %self.config.name, error = %e, "cleanup on drop failed");
        }
    }
}
