//! # appdatastore testkit
//!
//! Test utilities for appdatastore.
//!
//! This crate provides:
//! - Store fixtures isolated in a temporary segment directory
//! - Property-based generators for key names and values
//! - Multi-threaded stress drivers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use appds_core::DataStoreExt;
//! use appds_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|store| {
//!         store.set("key", &1u8).unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
