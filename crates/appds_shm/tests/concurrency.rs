//! Concurrency tests for shared items.
//!
//! Every thread opens its own handles, exactly as a separate process
//! would; the only thing they share is the segment directory.

use appds_shm::{SharedItem, ShmConfig, ShmError};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn config(dir: &TempDir, timeout: Duration) -> ShmConfig {
    ShmConfig::new()
        .dir(dir.path())
        .lock_retry(Duration::from_millis(1))
        .lock_timeout(timeout)
}

fn counter(payload: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&payload[..8]);
    u64::from_le_bytes(bytes)
}

#[test]
fn concurrent_updates_serialise() {
    const THREADS: usize = 4;
    const INCREMENTS: u64 = 25;

    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, Duration::from_secs(20));
    SharedItem::open("counter", 8, &cfg).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let cfg = cfg.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut item = SharedItem::attach("counter", &cfg).unwrap();
                barrier.wait();
                for _ in 0..INCREMENTS {
                    item.update(|current| {
                        let value = counter(current);
                        // Widen the window a lost update would need.
                        thread::yield_now();
                        Ok::<_, ShmError>((value + 1).to_le_bytes().to_vec())
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let item = SharedItem::attach("counter", &cfg).unwrap();
    assert_eq!(counter(&item.get().unwrap()), THREADS as u64 * INCREMENTS);
}

#[test]
fn concurrent_appends_never_mix() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, Duration::from_secs(20));
    SharedItem::open("log", 64, &cfg).unwrap();

    let writers: Vec<_> = [b'a', b'b']
        .into_iter()
        .map(|tag| {
            let cfg = cfg.clone();
            thread::spawn(move || {
                let mut item = SharedItem::attach("log", &cfg).unwrap();
                item.update(|current| {
                    let end = current.iter().position(|b| *b == 0).unwrap_or(current.len());
                    let mut next = current[..end].to_vec();
                    for _ in 0..8 {
                        next.push(tag);
                        thread::yield_now();
                    }
                    Ok::<_, ShmError>(next)
                })
                .unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let item = SharedItem::attach("log", &cfg).unwrap();
    let payload = item.get().unwrap();
    let text = std::str::from_utf8(&payload[..16]).unwrap();
    assert!(text == "aaaaaaaabbbbbbbb" || text == "bbbbbbbbaaaaaaaa", "{text}");
}

#[test]
fn writer_times_out_behind_slow_holder() {
    let dir = TempDir::new().unwrap();
    let holder_cfg = config(&dir, Duration::from_secs(5));
    let waiter_cfg = config(&dir, Duration::from_millis(50));

    let mut item = SharedItem::open("slow", 16, &holder_cfg).unwrap();
    item.set(b"StringPrefix").unwrap();

    let (locked_tx, locked_rx) = mpsc::channel();
    let holder = thread::spawn(move || {
        item.update(|_| {
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(300));
            Ok::<_, ShmError>(b"holder wins".to_vec())
        })
        .unwrap();
    });

    locked_rx.recv().unwrap();
    let mut waiter = SharedItem::attach("slow", &waiter_cfg).unwrap();
    let stale = waiter.get().unwrap();
    let err = waiter.set(&stale).unwrap_err();
    assert!(matches!(err, ShmError::LockTimeout { .. }), "{err}");

    holder.join().unwrap();
    assert_eq!(&waiter.get().unwrap()[..11], b"holder wins");
    assert_eq!(&waiter.get().unwrap()[11..], &[0u8; 5]);
}

#[test]
fn racing_creators_share_one_segment() {
    const THREADS: usize = 8;

    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, Duration::from_secs(5));
    let barrier = Arc::new(Barrier::new(THREADS));

    let openers: Vec<_> = (0..THREADS)
        .map(|i| {
            let cfg = cfg.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let item = SharedItem::open("race", 32 + i, &cfg).unwrap();
                (item.opened(), item.capacity().unwrap())
            })
        })
        .collect();

    let results: Vec<_> = openers.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results
        .iter()
        .filter(|(opened, _)| *opened == appds_shm::Opened::Created)
        .count();
    assert_eq!(created, 1);

    let capacity = results[0].1;
    assert!(results.iter().all(|(_, c)| *c == capacity));
}
