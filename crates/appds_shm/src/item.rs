//! A single shared value: one segment guarded by one named mutex.

use crate::config::ShmConfig;
use crate::error::{ShmError, ShmResult};
use crate::limits::validate_item_name;
use crate::mutex::NamedMutex;
use crate::segment::{Opened, Segment};
use std::time::Duration;
use tracing::warn;

/// A named value in shared memory with exclusive-access writes.
///
/// Reads take no lock and may observe a write in progress. `set` and
/// `update` hold the item's [`NamedMutex`] for the duration of the write,
/// so two writers on the same item never interleave, whichever process
/// they run in.
///
/// # Example
///
/// ```no_run
/// use appds_shm::{SharedItem, ShmConfig};
///
/// let config = ShmConfig::default();
/// let mut item = SharedItem::open("counter", 16, &config)?;
/// item.set(&[1])?;
/// item.update(|current| Ok::<_, appds_shm::ShmError>(vec![current[0] + 1]))?;
/// assert_eq!(item.get()?[0], 2);
/// # Ok::<(), appds_shm::ShmError>(())
/// ```
#[derive(Debug)]
pub struct SharedItem {
    segment: Segment,
    mutex: NamedMutex,
    timeout: Duration,
    opened: Opened,
}

impl SharedItem {
    /// Attaches to the item, creating it with `capacity` bytes if missing.
    pub fn open(name: &str, capacity: usize, config: &ShmConfig) -> ShmResult<Self> {
        let (mut segment, mutex) = Self::handles(name, config)?;
        let opened = segment.open(capacity)?;
        Ok(Self {
            segment,
            mutex,
            timeout: config.lock_timeout,
            opened,
        })
    }

    /// Attaches to an existing item.
    ///
    /// # Errors
    ///
    /// `NotFound` if the item does not exist.
    pub fn attach(name: &str, config: &ShmConfig) -> ShmResult<Self> {
        let (mut segment, mutex) = Self::handles(name, config)?;
        segment.attach()?;
        Ok(Self {
            segment,
            mutex,
            timeout: config.lock_timeout,
            opened: Opened::Attached,
        })
    }

    /// Returns `true` if the item exists.
    #[must_use]
    pub fn exists(name: &str, config: &ShmConfig) -> bool {
        Segment::exists(&config.dir, name)
    }

    /// Destroys the named item if it exists.
    ///
    /// Returns `true` if this call found the item.
    pub fn remove(name: &str, config: &ShmConfig) -> ShmResult<bool> {
        match Self::attach(name, config) {
            Ok(mut item) => item.delete().map(|()| true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn handles(name: &str, config: &ShmConfig) -> ShmResult<(Segment, NamedMutex)> {
        validate_item_name(name)?;
        config.validate()?;
        let segment = Segment::new(&config.dir, name)?;
        let mutex = NamedMutex::new(&config.dir, name, config.lock_retry)?;
        Ok((segment, mutex))
    }

    /// Name of the item.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segment.name()
    }

    /// Whether this handle created the item or attached to it.
    #[must_use]
    pub fn opened(&self) -> Opened {
        self.opened
    }

    /// Fixed capacity of the item in bytes.
    pub fn capacity(&self) -> ShmResult<usize> {
        self.segment.capacity()
    }

    /// Returns the raw payload, zero padding included, without locking.
    pub fn get(&self) -> ShmResult<Vec<u8>> {
        self.segment.read()
    }

    /// Replaces the payload under the item's lock.
    ///
    /// # Errors
    ///
    /// - `ValueTooLarge` if `value` exceeds the capacity (checked before
    ///   locking; the stored value is untouched)
    /// - `LockTimeout` if the lock could not be acquired
    pub fn set(&mut self, value: &[u8]) -> ShmResult<()> {
        let capacity = self.segment.capacity()?;
        if value.len() > capacity {
            return Err(ShmError::ValueTooLarge {
                len: value.len(),
                capacity,
            });
        }
        self.locked(|segment| segment.write(value))
    }

    /// Atomically rewrites the payload with `transform`.
    ///
    /// The transform receives the current raw payload and returns the new
    /// one. Lock, read, transform, write and unlock form one step with
    /// respect to every other `set`/`update` on this item. If the transform
    /// fails, or returns more than the capacity, nothing is written. The
    /// lock is released on every path.
    pub fn update<F, E>(&mut self, transform: F) -> Result<(), E>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, E>,
        E: From<ShmError>,
    {
        self.update_with(|current| transform(current).map(Some)).map(|_| ())
    }

    /// Like [`update`](Self::update), but the transform may return `None`
    /// to leave the payload as it is.
    ///
    /// Returns whether a new payload was written.
    pub fn update_with<F, E>(&mut self, transform: F) -> Result<bool, E>
    where
        F: FnOnce(&[u8]) -> Result<Option<Vec<u8>>, E>,
        E: From<ShmError>,
    {
        self.locked(|segment| {
            let current = segment.read()?;
            match transform(&current)? {
                Some(next) => {
                    segment.write(&next)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Detaches from the item; it stays for other handles.
    pub fn close(&mut self) -> ShmResult<()> {
        self.segment.close()
    }

    /// Destroys the item's segment.
    pub fn delete(&mut self) -> ShmResult<()> {
        self.segment.destroy()
    }

    /// Forcibly removes a lock left behind by a dead holder.
    pub fn break_lock(&self) -> ShmResult<bool> {
        self.mutex.break_lock()
    }

    fn locked<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Segment) -> Result<T, E>,
        E: From<ShmError>,
    {
        self.mutex.acquire(self.timeout)?;
        let result = f(&mut self.segment);
        let released = self.mutex.release();

        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!(item = %self.segment.name(), error = %release_err, "failed to release lock");
                Err(e)
            }
        }
    }
}
