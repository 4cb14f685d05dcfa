//! Shared-memory store configuration.

use crate::error::{StoreError, StoreResult};
use appds_shm::limits::validate_item_name;
use appds_shm::{ShmConfig, MAX_ITEM_NAME_LENGTH};
use std::path::PathBuf;
use std::time::Duration;

/// Appended to the store name to form the index item name.
pub const INDEX_SUFFIX: &str = "I";
/// Appended to the store name to form the expiry table item name.
pub const EXPIRY_SUFFIX: &str = "E";
/// Longest store name; it must leave room for the index/expiry suffix.
pub const MAX_STORE_NAME_LENGTH: usize = MAX_ITEM_NAME_LENGTH - INDEX_SUFFIX.len();
/// Store name used when none is configured.
pub const DEFAULT_STORE_NAME: &str = "AppDS_SHM";
/// Default capacity of the index and expiry table segments (16 KiB).
pub const DEFAULT_INDEX_CAPACITY: usize = 16 * 1024;
/// Default minimum capacity of a per-key segment (1 KiB).
pub const DEFAULT_ITEM_CAPACITY: usize = 1024;

/// Who destroys the shared index, expiry table and items on cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ownership {
    /// The instance that created the index owns the store.
    #[default]
    Creator,
    /// This instance owns the store even if it attached to it.
    Always,
    /// This instance never destroys shared state; cleanup only closes.
    Never,
}

/// Configuration for opening a [`SharedMemStore`](crate::SharedMemStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store name; the index and expiry items are named after it.
    pub name: String,

    /// Segment directory and lock timing.
    pub shm: ShmConfig,

    /// Capacity of the index and expiry table segments.
    pub index_capacity: usize,

    /// Minimum capacity of a per-key segment. A larger first value gets a
    /// segment of its own size; later values never grow it.
    pub item_capacity: usize,

    /// Who destroys shared state on cleanup.
    pub ownership: Ownership,

    /// Whether an owning cleanup also destroys every indexed item.
    pub purge_items_on_cleanup: bool,

    /// Reject names that would nest under, or above, an existing key.
    pub dot_names: bool,

    /// Seal the index and expiry table. Requires a codec with a key.
    pub encrypt_index: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            shm: ShmConfig::default(),
            index_capacity: DEFAULT_INDEX_CAPACITY,
            item_capacity: DEFAULT_ITEM_CAPACITY,
            ownership: Ownership::Creator,
            purge_items_on_cleanup: true,
            dot_names: false,
            encrypt_index: false,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the segment directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shm = self.shm.dir(dir);
        self
    }

    /// Sets the pause between lock attempts.
    #[must_use]
    pub fn lock_retry(mut self, retry: Duration) -> Self {
        self.shm = self.shm.lock_retry(retry);
        self
    }

    /// Sets the lock wait budget.
    #[must_use]
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.shm = self.shm.lock_timeout(timeout);
        self
    }

    /// Sets the index and expiry table capacity.
    #[must_use]
    pub const fn index_capacity(mut self, capacity: usize) -> Self {
        self.index_capacity = capacity;
        self
    }

    /// Sets the minimum per-key segment capacity.
    #[must_use]
    pub const fn item_capacity(mut self, capacity: usize) -> Self {
        self.item_capacity = capacity;
        self
    }

    /// Sets the ownership policy.
    #[must_use]
    pub const fn ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    /// Sets whether an owning cleanup destroys every indexed item.
    #[must_use]
    pub const fn purge_items_on_cleanup(mut self, value: bool) -> Self {
        self.purge_items_on_cleanup = value;
        self
    }

    /// Enables or disables dot-name validation.
    #[must_use]
    pub const fn dot_names(mut self, value: bool) -> Self {
        self.dot_names = value;
        self
    }

    /// Enables or disables sealing of the index and expiry table.
    #[must_use]
    pub const fn encrypt_index(mut self, value: bool) -> Self {
        self.encrypt_index = value;
        self
    }

    /// Name of the index item.
    #[must_use]
    pub fn index_name(&self) -> String {
        format!("{}{INDEX_SUFFIX}", self.name)
    }

    /// Name of the expiry table item.
    #[must_use]
    pub fn expiry_name(&self) -> String {
        format!("{}{EXPIRY_SUFFIX}", self.name)
    }

    /// Checks the configuration before any resource is touched.
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.is_empty() {
            return Err(StoreError::invalid_argument("store name cannot be empty"));
        }
        if self.name.chars().count() > MAX_STORE_NAME_LENGTH {
            return Err(StoreError::invalid_argument(format!(
                "store name can be at most {MAX_STORE_NAME_LENGTH} characters: {}",
                self.name
            )));
        }
        validate_item_name(&self.index_name()).map_err(StoreError::from_shm_argument)?;
        validate_item_name(&self.expiry_name()).map_err(StoreError::from_shm_argument)?;
        if self.index_capacity == 0 || self.item_capacity == 0 {
            return Err(StoreError::invalid_argument(
                "segment capacities must be greater than zero",
            ));
        }
        self.shm.validate().map_err(StoreError::from_shm_argument)
    }
}
