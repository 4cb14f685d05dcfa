//! Test fixtures and store helpers.
//!
//! Every fixture keeps its segments in its own temporary directory, so
//! tests never see each other's stores and nothing is left in `/dev/shm`.

use appds_codec::Codec;
use appds_core::{MemoryStore, Ownership, SharedMemStore, StoreConfig};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Store name used by fixtures.
pub const TEST_STORE_NAME: &str = "test";

/// Password used by [`test_codec`].
pub const TEST_PASSWORD: &[u8] = b"correct horse battery staple";

/// Store configuration rooted at `dir` with fast lock polling.
pub fn test_config(dir: &Path) -> StoreConfig {
    StoreConfig::new()
        .name(TEST_STORE_NAME)
        .dir(dir)
        .lock_retry(Duration::from_millis(1))
        .lock_timeout(Duration::from_secs(5))
}

/// A codec that can seal values.
pub fn test_codec() -> Codec {
    Codec::with_password(TEST_PASSWORD, None).expect("Failed to derive test key")
}

/// A shared store with automatic cleanup.
pub struct TestStore {
    /// The store instance. Dropped before the directory.
    pub store: SharedMemStore,
    config: StoreConfig,
    dir: TempDir,
}

impl TestStore {
    /// Creates a store with the default test configuration.
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Creates a store after adjusting the test configuration.
    pub fn with_config<F>(adjust: F) -> Self
    where
        F: FnOnce(StoreConfig) -> StoreConfig,
    {
        Self::with_codec(adjust, Codec::new())
    }

    /// Creates a store with an adjusted configuration and a given codec.
    pub fn with_codec<F>(adjust: F, codec: Codec) -> Self
    where
        F: FnOnce(StoreConfig) -> StoreConfig,
    {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let config = adjust(test_config(dir.path()));
        let store = SharedMemStore::open_with_codec(config.clone(), codec)
            .expect("Failed to open test store");
        Self { store, config, dir }
    }

    /// Segment directory of this store.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration the fixture opened its store with.
    pub fn config(&self) -> StoreConfig {
        self.config.clone()
    }

    /// Opens another instance of the same store, as a second process would.
    ///
    /// The peer never owns the store, so dropping it leaves state intact.
    pub fn peer(&self) -> SharedMemStore {
        self.peer_with(Codec::new())
    }

    /// Opens a non-owning peer with the given codec.
    pub fn peer_with(&self, codec: Codec) -> SharedMemStore {
        SharedMemStore::open_with_codec(self.config().ownership(Ownership::Never), codec)
            .expect("Failed to open peer store")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = SharedMemStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary shared store.
///
/// # Example
///
/// ```rust,ignore
/// use appds_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         assert!(store.list("").unwrap().is_empty());
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SharedMemStore) -> R,
{
    let test_store = TestStore::new();
    f(&test_store.store)
}

/// Runs a test with a dot-name validating memory store.
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&MemoryStore) -> R,
{
    let store = MemoryStore::new()
        .with_codec(test_codec())
        .with_dot_names(true);
    f(&store)
}
