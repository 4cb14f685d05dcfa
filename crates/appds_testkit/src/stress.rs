//! Stress drivers for shared stores.
//!
//! Each worker thread opens its own store instance, as a separate process
//! would, so the only shared state is the segment directory.

use appds_core::{DataStore, DataStoreExt, Ownership, SharedMemStore, StoreConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Distinct keys per thread.
    pub keys: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 50,
            threads: 4,
            keys: 5,
        }
    }
}

/// Key written by `thread` for slot `slot`.
pub fn stress_key(thread: usize, slot: usize) -> String {
    format!("t{thread}k{slot}")
}

/// Every thread writes then reads back its own keys through its own
/// instance of the store described by `config`.
///
/// A read that does not return the value just written counts as a failure.
pub fn stress_concurrent_sets(config: &StoreConfig, stress: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(stress.threads));

    let start = Instant::now();
    let handles: Vec<_> = (0..stress.threads)
        .map(|t| {
            let config = config.clone().ownership(Ownership::Never);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let stress = stress.clone();

            thread::spawn(move || {
                let store = SharedMemStore::open(config).expect("Failed to open store");
                barrier.wait();
                for i in 0..stress.operations {
                    let key = stress_key(t, i % stress.keys);
                    let ok = store.set(&key, &i).is_ok()
                        && matches!(store.get::<usize>(&key), Ok(Some(v)) if v == i);
                    if ok {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Stress worker panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Every thread removes keys written by the others while sweeping.
pub fn stress_concurrent_deletes(config: &StoreConfig, stress: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let handles: Vec<_> = (0..stress.threads)
        .map(|t| {
            let config = config.clone().ownership(Ownership::Never);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let stress = stress.clone();

            thread::spawn(move || {
                let store = SharedMemStore::open(config).expect("Failed to open store");
                let victim = (t + 1) % stress.threads;
                for slot in 0..stress.keys {
                    let result = store
                        .delete(&stress_key(victim, slot))
                        .and_then(|()| store.maintenance().map(|_| ()));
                    if result.is_ok() {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Stress worker panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
