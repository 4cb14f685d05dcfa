//! Fixed-capacity named shared-memory segments.

use crate::error::{ShmError, ShmResult};
use crate::limits::validate_segment_name;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How [`Segment::open`] obtained its segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    /// This handle created the segment (all zeros).
    Created,
    /// The segment already existed and this handle attached to it.
    Attached,
}

/// A handle on one named shared-memory segment.
///
/// The segment is an object of fixed length in the shared-memory directory,
/// mapped shared and writable. Any process that knows the directory and the
/// name can attach to it. A handle starts out unopened.
///
/// Writes are not exclusive; callers that need atomicity hold the segment's
/// [`NamedMutex`](crate::NamedMutex) first.
#[derive(Debug)]
pub struct Segment {
    name: String,
    dir: PathBuf,
    path: PathBuf,
    map: Option<MmapMut>,
}

impl Segment {
    /// Creates an unopened handle for `name` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for names the host cannot represent.
    pub fn new(dir: &Path, name: &str) -> ShmResult<Self> {
        validate_segment_name(name)?;
        Ok(Self {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            path: dir.join(name),
            map: None,
        })
    }

    /// Returns `true` if a segment named `name` exists in `dir`.
    #[must_use]
    pub fn exists(dir: &Path, name: &str) -> bool {
        validate_segment_name(name).is_ok() && dir.join(name).is_file()
    }

    /// Name of the segment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the handle holds a segment.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Fixed capacity of the held segment.
    pub fn capacity(&self) -> ShmResult<usize> {
        Ok(self.map()?.len())
    }

    /// Attaches to the named segment, creating it with `capacity` bytes if it
    /// does not exist yet.
    ///
    /// When attaching, the existing segment's capacity wins over `capacity`.
    /// Creation is atomic: the segment becomes visible under its name only
    /// once it has its full length.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `capacity` is zero
    /// - `AlreadyOpen` if this handle already holds a segment
    pub fn open(&mut self, capacity: usize) -> ShmResult<Opened> {
        if capacity == 0 {
            return Err(ShmError::invalid_argument(
                "capacity must be greater than zero",
            ));
        }
        if self.map.is_some() {
            return Err(ShmError::AlreadyOpen {
                name: self.name.clone(),
            });
        }

        loop {
            if let Some(map) = self.map_existing()? {
                self.map = Some(map);
                debug!(segment = %self.name, "attached to shared memory segment");
                return Ok(Opened::Attached);
            }

            match self.create(capacity) {
                Ok(map) => {
                    self.map = Some(map);
                    debug!(segment = %self.name, capacity, "created shared memory segment");
                    return Ok(Opened::Created);
                }
                // Lost a creation race; attach to the winner's segment.
                Err(ShmError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Attaches to the named segment without ever creating it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such segment exists
    /// - `AlreadyOpen` if this handle already holds a segment
    pub fn attach(&mut self) -> ShmResult<()> {
        if self.map.is_some() {
            return Err(ShmError::AlreadyOpen {
                name: self.name.clone(),
            });
        }
        let map = self
            .map_existing()?
            .ok_or_else(|| ShmError::not_found(&self.name))?;
        self.map = Some(map);
        Ok(())
    }

    /// Returns the full raw buffer, zero padding included.
    pub fn read(&self) -> ShmResult<Vec<u8>> {
        Ok(self.map()?.to_vec())
    }

    /// Copies `bytes` into the segment and zero-fills the remainder.
    ///
    /// # Errors
    ///
    /// `ValueTooLarge` if `bytes` exceeds the capacity; nothing is written.
    pub fn write(&mut self, bytes: &[u8]) -> ShmResult<()> {
        let name = &self.name;
        let map = self.map.as_mut().ok_or_else(|| ShmError::not_found(name))?;

        let capacity = map.len();
        if bytes.len() > capacity {
            return Err(ShmError::ValueTooLarge {
                len: bytes.len(),
                capacity,
            });
        }

        map[..bytes.len()].copy_from_slice(bytes);
        map[bytes.len()..].fill(0);
        Ok(())
    }

    /// Detaches this handle; the segment stays for everyone else.
    pub fn close(&mut self) -> ShmResult<()> {
        self.map
            .take()
            .map(drop)
            .ok_or_else(|| ShmError::not_found(&self.name))
    }

    /// Detaches and permanently removes the segment.
    ///
    /// Other processes still attached keep their mapping until they close
    /// it, but the name is free: the next `open` creates a fresh segment.
    pub fn destroy(&mut self) -> ShmResult<()> {
        self.close()?;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(segment = %self.name, "destroyed shared memory segment");
                Ok(())
            }
            // Someone else destroyed it first.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn map(&self) -> ShmResult<&MmapMut> {
        self.map
            .as_ref()
            .ok_or_else(|| ShmError::not_found(&self.name))
    }

    fn map_existing(&self) -> ShmResult<Option<MmapMut>> {
        let file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Err(ShmError::invalid_argument(format!(
                "segment {} has zero length",
                self.name
            )));
        }
        map_shared(&file).map(Some)
    }

    fn create(&self, capacity: usize) -> ShmResult<MmapMut> {
        fs::create_dir_all(&self.dir)?;

        let staged = tempfile::Builder::new()
            .prefix(".appds-")
            .tempfile_in(&self.dir)?;
        staged.as_file().set_len(capacity as u64)?;

        let file = staged
            .persist_noclobber(&self.path)
            .map_err(|e| ShmError::Io(e.error))?;
        map_shared(&file)
    }
}

#[allow(unsafe_code)]
fn map_shared(file: &File) -> ShmResult<MmapMut> {
    // Safety: segments are only ever resized at creation, before they are
    // published under their name, so the mapping never outlives its length.
    // Concurrent writers in other processes can tear reads, which callers
    // accept by contract.
    let map = unsafe { MmapOptions::new().map_mut(file)? };
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_then_attach() {
        let dir = TempDir::new().unwrap();
        let mut first = Segment::new(dir.path(), "seg").unwrap();
        assert_eq!(first.open(32).unwrap(), Opened::Created);
        assert!(Segment::exists(dir.path(), "seg"));
        assert_eq!(first.read().unwrap(), vec![0u8; 32]);

        let mut second = Segment::new(dir.path(), "seg").unwrap();
        assert_eq!(second.open(4096).unwrap(), Opened::Attached);
        assert_eq!(second.capacity().unwrap(), 32);
    }

    #[test]
    fn writes_are_shared_and_zero_padded() {
        let dir = TempDir::new().unwrap();
        let mut writer = Segment::new(dir.path(), "pad").unwrap();
        writer.open(8).unwrap();
        let mut reader = Segment::new(dir.path(), "pad").unwrap();
        reader.attach().unwrap();

        writer.write(b"abcdefgh").unwrap();
        writer.write(b"xy").unwrap();
        assert_eq!(reader.read().unwrap(), b"xy\0\0\0\0\0\0");
    }

    #[test]
    fn oversize_write_leaves_payload() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(dir.path(), "big").unwrap();
        segment.open(4).unwrap();
        segment.write(b"keep").unwrap();

        let err = segment.write(b"too long").unwrap_err();
        assert!(matches!(err, ShmError::ValueTooLarge { len: 8, capacity: 4 }));
        assert_eq!(segment.read().unwrap(), b"keep");
    }

    #[test]
    fn zero_capacity_rejected() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(dir.path(), "zero").unwrap();
        assert!(matches!(
            segment.open(0),
            Err(ShmError::InvalidArgument { .. })
        ));
        assert!(!Segment::exists(dir.path(), "zero"));
    }

    #[test]
    fn double_open_rejected() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(dir.path(), "twice").unwrap();
        segment.open(4).unwrap();
        assert!(matches!(segment.open(4), Err(ShmError::AlreadyOpen { .. })));
    }

    #[test]
    fn unopened_handle_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(dir.path(), "none").unwrap();
        assert!(segment.read().unwrap_err().is_not_found());
        assert!(segment.close().unwrap_err().is_not_found());
        assert!(segment.destroy().unwrap_err().is_not_found());
        assert!(segment.attach().unwrap_err().is_not_found());
    }

    #[test]
    fn close_keeps_segment() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(dir.path(), "keep").unwrap();
        segment.open(4).unwrap();
        segment.write(b"ab").unwrap();
        segment.close().unwrap();
        assert!(!segment.is_open());

        assert_eq!(segment.open(4).unwrap(), Opened::Attached);
        assert_eq!(&segment.read().unwrap()[..2], b"ab");
    }

    #[test]
    fn destroy_then_open_is_fresh() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(dir.path(), "fresh").unwrap();
        segment.open(4).unwrap();
        segment.write(b"old").unwrap();

        let mut other = Segment::new(dir.path(), "fresh").unwrap();
        other.attach().unwrap();

        segment.destroy().unwrap();
        assert!(!Segment::exists(dir.path(), "fresh"));
        // Destroying an already removed segment is not an error.
        other.destroy().unwrap();

        assert_eq!(segment.open(4).unwrap(), Opened::Created);
        assert_eq!(segment.read().unwrap(), vec![0u8; 4]);
    }

    #[test]
    fn no_staging_files_left_behind() {
        let dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            Segment::new(dir.path(), name).unwrap().open(16).unwrap();
        }
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|n| !n.starts_with(".appds-")));
    }
}
