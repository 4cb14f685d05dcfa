//! # appdatastore shared memory
//!
//! Named, fixed-capacity shared-memory values that independent processes
//! can read and mutate concurrently.
//!
//! - [`Segment`] - one named region of fixed capacity; raw byte read/write
//! - [`NamedMutex`] - cross-process lock: holding it means having created
//!   an object named after the segment, which fails while it exists
//! - [`SharedItem`] - a segment plus its lock, with locked `set` and an
//!   atomic read-modify-write `update`
//!
//! Nothing here interprets payloads. Values are zero-padded to the segment
//! capacity, so whatever is stored must be self-delimiting.
//!
//! Segments are local to the host. The directory they live in comes from
//! [`ShmConfig`]; processes that share items must agree on it.

#![warn(missing_docs)]

mod config;
mod error;
mod item;
pub mod limits;
mod mutex;
mod segment;

pub use config::{ShmConfig, DEFAULT_LOCK_RETRY, DEFAULT_LOCK_TIMEOUT};
pub use error::{ShmError, ShmResult};
pub use item::SharedItem;
pub use limits::{LOCK_NAME_SUFFIX, MAX_ITEM_NAME_LENGTH, MAX_SEGMENT_NAME_LENGTH};
pub use mutex::NamedMutex;
pub use segment::{Opened, Segment};
