//! Naming limits and the location of shared-memory objects.
//!
//! Segment names are kept short enough for the strictest host
//! (`shm_open` on macOS allows 14 characters after the leading slash), and
//! every lock name is its segment name plus [`LOCK_NAME_SUFFIX`], so item
//! names get one character less than raw segment names.
//!
//! - Linux with a mounted `/dev/shm`: that tmpfs, the same place
//!   `shm_open` puts its objects
//! - elsewhere: the system temp directory

use crate::error::{ShmError, ShmResult};
use std::path::{Path, PathBuf};

/// Longest name any segment (data or lock) may have.
pub const MAX_SEGMENT_NAME_LENGTH: usize = 14;

/// Appended to a segment name to form its lock name.
///
/// The suffix character is forbidden in item names, so a lock can never
/// shadow a data segment.
pub const LOCK_NAME_SUFFIX: &str = "~";

/// Longest name a shared item may have.
pub const MAX_ITEM_NAME_LENGTH: usize = MAX_SEGMENT_NAME_LENGTH - LOCK_NAME_SUFFIX.len();

const NATIVE_SHM_DIR: &str = "/dev/shm";

/// Directory holding shared-memory objects on this host.
pub fn default_shm_dir() -> PathBuf {
    if has_native_shm() {
        PathBuf::from(NATIVE_SHM_DIR)
    } else {
        std::env::temp_dir()
    }
}

/// Returns `true` if this host has a RAM-backed shm directory.
///
/// Minimal containers may run Linux without `/dev/shm` mounted.
pub fn has_native_shm() -> bool {
    cfg!(target_os = "linux") && Path::new(NATIVE_SHM_DIR).is_dir()
}

/// Lock name belonging to a segment name.
pub fn lock_name(segment: &str) -> String {
    format!("{segment}{LOCK_NAME_SUFFIX}")
}

pub(crate) fn validate_segment_name(name: &str) -> ShmResult<()> {
    if name.is_empty() {
        return Err(ShmError::invalid_argument("name cannot be empty"));
    }
    if name.chars().count() > MAX_SEGMENT_NAME_LENGTH {
        return Err(ShmError::invalid_argument(format!(
            "name can be at most {MAX_SEGMENT_NAME_LENGTH} characters: {name}"
        )));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ShmError::invalid_argument(format!(
            "name is not a valid shared memory name: {name:?}"
        )));
    }
    Ok(())
}

/// Checks that `name` can be used for a shared item.
pub fn validate_item_name(name: &str) -> ShmResult<()> {
    validate_segment_name(name)?;
    if name.chars().count() > MAX_ITEM_NAME_LENGTH {
        return Err(ShmError::invalid_argument(format!(
            "item name can be at most {MAX_ITEM_NAME_LENGTH} characters: {name}"
        )));
    }
    if name.contains(LOCK_NAME_SUFFIX) {
        return Err(ShmError::invalid_argument(format!(
            "item name cannot contain {LOCK_NAME_SUFFIX:?}: {name}"
        )));
    }
    Ok(())
}
