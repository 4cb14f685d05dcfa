//! # appdatastore core
//!
//! Key/value datastores for application state.
//!
//! - [`SharedMemStore`] - shared by every process on the host that opens
//!   the same store name; built on [`appds_shm`] items
//! - [`MemoryStore`] - the same contract inside one process
//!
//! Both implement [`DataStore`]; typed `get`/`set` come from
//! [`DataStoreExt`]. Values are encoded by an [`appds_codec::Codec`] and
//! can be sealed per value when the codec has a key.
//!
//! ## Expiry
//!
//! A value written with a TTL is removed by the next sweep after its
//! instant passes. Every read and write sweeps first, so an expired key is
//! never returned.
//!
//! ## Dot names
//!
//! With dot names enabled, `"db.host"` and `"db.port"` may coexist but
//! `"db"` may not sit beside them, since it would shadow both in a nested
//! view such as [`DataStoreExt::export_json`].
//!
//! ## Example
//!
//! ```rust
//! use appds_core::{DataStore, DataStoreExt, MemoryStore, SetOptions};
//! use std::time::Duration;
//!
//! let store = MemoryStore::new().with_dot_names(true);
//! store.set("db.host", "localhost").unwrap();
//! store
//!     .set_with("db.port", &5432u16, SetOptions::new().ttl(Duration::from_secs(60)))
//!     .unwrap();
//! assert!(store.set("db", "oops").is_err());
//! assert_eq!(store.list("db.").unwrap().len(), 2);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
pub mod expiry;
mod export;
mod memory;
pub mod names;
mod shared;
mod store;

pub use appds_codec::Codec;
pub use config::{
    Ownership, StoreConfig, DEFAULT_INDEX_CAPACITY, DEFAULT_ITEM_CAPACITY, DEFAULT_STORE_NAME,
    EXPIRY_SUFFIX, INDEX_SUFFIX, MAX_STORE_NAME_LENGTH,
};
pub use error::{StoreError, StoreResult};
pub use export::to_json;
pub use memory::MemoryStore;
pub use names::validate_dot_name;
pub use shared::SharedMemStore;
pub use store::{DataStore, DataStoreExt, SetOptions, SweepFailure, SweepReport};
