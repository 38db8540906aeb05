//! Tests for cross-session concurrency
//!
//! Validates that operations on distinct sessions proceed independently:
//! holding one session's lock must not stall writers or readers of another,
//! and parallel chunk writers converge to completion on their own sessions.

use sta_mock::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn writer_progresses_while_another_session_is_locked() {
    let registry = Arc::new(SessionRegistry::new());
    let held_id = registry.open().unwrap();
    let free_id = registry.open().unwrap();

    // Hold session A's lock for the duration of the test.
    let held = registry.get(&held_id).unwrap();
    let _guard = held.lock().await;

    // Session B must accept writes promptly regardless.
    let free = registry.get(&free_id).unwrap();
    let write = timeout(Duration::from_secs(1), async {
        let mut session = free.lock().await;
        session.declare_total_size(4);
        session.write_chunk(0, &[1, 2, 3, 4]).unwrap();
        session.is_complete()
    })
    .await
    .expect("write to an unrelated session must not block");

    assert!(write);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_writers_complete_their_own_sessions() {
    const TOTAL: u64 = 64 * 1024;
    const CHUNK: u64 = 4 * 1024;

    let registry = Arc::new(SessionRegistry::new());
    let first = registry.open().unwrap();
    let second = registry.open().unwrap();

    let mut tasks = Vec::new();
    for (id, fill, forward) in [(first.clone(), 0xAAu8, true), (second.clone(), 0x55u8, false)] {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let session = registry.get(&id).unwrap();
            let mut offsets: Vec<u64> = (0..TOTAL / CHUNK).map(|i| i * CHUNK).collect();
            if !forward {
                offsets.reverse();
            }
            for offset in offsets {
                let mut session = session.lock().await;
                session.declare_total_size(TOTAL);
                session.write_chunk(offset, &[fill; CHUNK as usize]).unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for (id, fill) in [(first, 0xAAu8), (second, 0x55u8)] {
        let session = registry.get(&id).unwrap();
        let session = session.lock().await;
        assert!(session.is_complete(), "session {} should be complete", id);
        let bytes = session.read_all().unwrap();
        assert_eq!(bytes.len() as u64, TOTAL);
        assert!(bytes.iter().all(|&b| b == fill));
    }
}
