//! CLI command implementations.

pub mod delete;
pub mod destroy;
pub mod export;
pub mod get;
pub mod has;
pub mod list;
pub mod set;
pub mod sweep;
pub mod unlock;

use appds_codec::{Codec, CodecError};
use appds_core::{Ownership, SharedMemStore, StoreConfig, StoreError};
use appds_shm::ShmError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The key is not in the store.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Shared-memory operation failed.
    #[error(transparent)]
    Shm(#[from] ShmError),

    /// Key derivation failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// JSON output failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Store selection shared by every command.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Store name.
    pub name: String,
    /// Segment directory override.
    pub dir: Option<PathBuf>,
    /// Dot-name validation.
    pub dot_names: bool,
    /// Password for sealed values.
    pub password: Option<String>,
}

impl StoreOptions {
    /// Store configuration with the given ownership.
    pub fn config(&self, ownership: Ownership) -> StoreConfig {
        let config = StoreConfig::new()
            .name(self.name.clone())
            .dot_names(self.dot_names)
            .ownership(ownership);
        match &self.dir {
            Some(dir) => config.dir(dir),
            None => config,
        }
    }

    /// Codec for this invocation; keyless without a password.
    pub fn codec(&self) -> CliResult<Codec> {
        match &self.password {
            Some(password) => Ok(Codec::with_password(password.as_bytes(), None)?),
            None => Ok(Codec::new()),
        }
    }

    /// Opens the store without taking ownership, so it outlives this process.
    pub fn open(&self) -> CliResult<SharedMemStore> {
        self.open_as(Ownership::Never)
    }

    /// Opens the store with the given ownership.
    pub fn open_as(&self, ownership: Ownership) -> CliResult<SharedMemStore> {
        Ok(SharedMemStore::open_with_codec(
            self.config(ownership),
            self.codec()?,
        )?)
    }
}
