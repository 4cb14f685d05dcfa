//! A cross-process mutex built from exclusive creation of a named object.
//!
//! Creating a uniquely named object with "fail if it exists" semantics is
//! atomic across unrelated processes, so the existence of the lock object
//! is the lock. Whoever creates it holds it; releasing removes it.

use crate::error::{ShmError, ShmResult};
use crate::limits::{lock_name, validate_segment_name};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Lock guarding one segment, named `<segment><LOCK_NAME_SUFFIX>`.
///
/// Not reentrant: a handle that holds the lock cannot acquire it again.
#[derive(Debug)]
pub struct NamedMutex {
    name: String,
    path: PathBuf,
    retry: Duration,
    held: Option<PathBuf>,
}

impl NamedMutex {
    /// Creates a handle for the lock of `segment` inside `dir`.
    pub fn new(dir: &Path, segment: &str, retry: Duration) -> ShmResult<Self> {
        if retry.is_zero() {
            return Err(ShmError::invalid_argument(
                "lock retry interval must be greater than zero",
            ));
        }
        let name = lock_name(segment);
        validate_segment_name(&name)?;
        Ok(Self {
            path: dir.join(&name),
            name,
            retry,
            held: None,
        })
    }

    /// Name of the lock object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this handle holds the lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Returns `true` if any handle, in any process, holds this lock now.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }

    /// Acquires the lock, retrying until `timeout` of cumulative waiting.
    ///
    /// # Errors
    ///
    /// - `AlreadyHeld` if this handle holds the lock
    /// - `InvalidLock` if the handle's bookkeeping names another lock
    /// - `LockTimeout` if the lock stayed taken for the whole budget
    pub fn acquire(&mut self, timeout: Duration) -> ShmResult<()> {
        self.check_not_held()?;

        let mut waited = Duration::ZERO;
        loop {
            if self.try_create()? {
                self.held = Some(self.path.clone());
                debug!(lock = %self.name, ?waited, "lock acquired");
                return Ok(());
            }
            if waited >= timeout {
                return Err(ShmError::LockTimeout {
                    name: self.name.clone(),
                    waited,
                });
            }
            thread::sleep(self.retry);
            waited += self.retry;
        }
    }

    /// Makes one attempt to acquire the lock.
    pub fn try_acquire(&mut self) -> ShmResult<bool> {
        self.check_not_held()?;
        let acquired = self.try_create()?;
        if acquired {
            self.held = Some(self.path.clone());
        }
        Ok(acquired)
    }

    /// Releases the lock by removing the lock object.
    ///
    /// # Errors
    ///
    /// - `NotHeld` if this handle does not hold the lock
    /// - `InvalidLock` if the handle's bookkeeping names another lock
    pub fn release(&mut self) -> ShmResult<()> {
        match self.held.take() {
            None => Err(ShmError::NotHeld {
                name: self.name.clone(),
            }),
            Some(held) if held != self.path => {
                self.held = Some(held);
                Err(ShmError::InvalidLock {
                    name: self.name.clone(),
                })
            }
            Some(_) => {
                match fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        warn!(lock = %self.name, "lock was broken while held");
                    }
                    Err(e) => return Err(e.into()),
                }
                debug!(lock = %self.name, "lock released");
                Ok(())
            }
        }
    }

    /// Removes the lock object regardless of who holds it.
    ///
    /// Only for recovering from a holder that died without releasing.
    /// Returns `true` if a lock object was removed.
    pub fn break_lock(&self) -> ShmResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                warn!(lock = %self.name, "lock broken");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn check_not_held(&self) -> ShmResult<()> {
        match &self.held {
            None => Ok(()),
            Some(held) if *held == self.path => Err(ShmError::AlreadyHeld {
                name: self.name.clone(),
            }),
            Some(_) => Err(ShmError::InvalidLock {
                name: self.name.clone(),
            }),
        }
    }

    fn try_create(&self) -> ShmResult<bool> {
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = file.set_len(1) {
            let _ = fs::remove_file(&self.path);
            return Err(e.into());
        }
        Ok(true)
    }
}

impl Drop for NamedMutex {
    fn drop(&mut self) {
        if self.held.is_some() {
            if let Err(e) = self.release() {
                warn!(lock = %self.name, error = %e, "failed to release lock on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    const RETRY: Duration = Duration::from_millis(5);

    #[test]
    fn acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let mut lock = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        assert_eq!(lock.name(), "item~");

        lock.acquire(Duration::ZERO).unwrap();
        assert!(lock.is_held());
        assert!(lock.is_locked());
        assert_eq!(fs::metadata(dir.path().join("item~")).unwrap().len(), 1);

        lock.release().unwrap();
        assert!(!lock.is_held());
        assert!(!lock.is_locked());
    }

    #[test]
    fn other_handles_observe_the_lock() {
        let dir = TempDir::new().unwrap();
        let mut holder = NamedMutex::new(dir.path(), "seen", RETRY).unwrap();
        let watcher = NamedMutex::new(dir.path(), "seen", RETRY).unwrap();
        let elsewhere = NamedMutex::new(dir.path(), "other", RETRY).unwrap();

        holder.acquire(Duration::ZERO).unwrap();
        assert!(watcher.is_locked());
        assert!(!watcher.is_held());
        assert!(!elsewhere.is_locked());

        holder.release().unwrap();
        assert!(!watcher.is_locked());
    }

    #[test]
    fn not_reentrant() {
        let dir = TempDir::new().unwrap();
        let mut lock = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        lock.acquire(Duration::ZERO).unwrap();
        assert!(matches!(
            lock.acquire(Duration::ZERO),
            Err(ShmError::AlreadyHeld { .. })
        ));
        assert!(lock.is_held());
    }

    #[test]
    fn release_without_holding() {
        let dir = TempDir::new().unwrap();
        let mut lock = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        assert!(matches!(lock.release(), Err(ShmError::NotHeld { .. })));
    }

    #[test]
    fn second_handle_times_out() {
        let dir = TempDir::new().unwrap();
        let mut holder = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        let mut waiter = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        holder.acquire(Duration::ZERO).unwrap();

        let started = Instant::now();
        let err = waiter.acquire(Duration::from_millis(40)).unwrap_err();
        assert!(err.is_lock_timeout());
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(!waiter.is_held());

        holder.release().unwrap();
        waiter.acquire(Duration::ZERO).unwrap();
    }

    #[test]
    fn waiter_gets_lock_after_release() {
        let dir = TempDir::new().unwrap();
        let mut holder = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        holder.acquire(Duration::ZERO).unwrap();

        let path = dir.path().to_path_buf();
        let waiter = thread::spawn(move || {
            let mut waiter = NamedMutex::new(&path, "item", RETRY).unwrap();
            waiter.acquire(Duration::from_secs(5)).map(|()| waiter.is_held())
        });

        thread::sleep(Duration::from_millis(30));
        holder.release().unwrap();
        assert!(waiter.join().unwrap().unwrap());
    }

    #[test]
    fn try_acquire_once() {
        let dir = TempDir::new().unwrap();
        let mut a = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        let mut b = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        assert!(a.try_acquire().unwrap());
        assert!(!b.try_acquire().unwrap());
    }

    #[test]
    fn drop_releases() {
        let dir = TempDir::new().unwrap();
        {
            let mut lock = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
            lock.acquire(Duration::ZERO).unwrap();
        }
        assert!(!dir.path().join("item~").exists());
    }

    #[test]
    fn break_stale_lock() {
        let dir = TempDir::new().unwrap();
        let mut crashed = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        crashed.acquire(Duration::ZERO).unwrap();
        std::mem::forget(crashed);

        let mut next = NamedMutex::new(dir.path(), "item", RETRY).unwrap();
        assert!(!next.try_acquire().unwrap());
        assert!(next.break_lock().unwrap());
        assert!(!next.break_lock().unwrap());
        next.acquire(Duration::ZERO).unwrap();
    }

    #[test]
    fn zero_retry_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            NamedMutex::new(dir.path(), "item", Duration::ZERO),
            Err(ShmError::InvalidArgument { .. })
        ));
    }
}
