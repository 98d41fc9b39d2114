mod common;

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use contentmon::engine::{Monitor, MonitorEvent};
use contentmon::types::MonitorState;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[tokio::test(flavor = "multi_thread")]
async fn reports_content_changes_from_the_real_backend() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("sub").join("b.json");
    fs::create_dir_all(b.parent().unwrap()).unwrap();
    fs::write(&b, b"{\"b\":0}").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<MonitorEvent>();
    let monitor = Monitor::new([a.clone(), b.clone()], tx).unwrap();
    monitor.start();

    // Start resync: only the file that exists.
    assert_eq!(
        with_timeout(rx.recv()).await,
        Some(MonitorEvent::FileChanged {
            path: b.clone(),
            body: Some(Arc::from(&b"{\"b\":0}"[..])),
        })
    );

    fs::write(&a, b"{\"x\":1}").unwrap();
    assert_eq!(
        with_timeout(rx.recv()).await,
        Some(MonitorEvent::FileChanged {
            path: a.clone(),
            body: Some(Arc::from(&b"{\"x\":1}"[..])),
        })
    );

    // Same bytes again: content-triggered, not write-triggered.
    fs::write(&a, b"{\"x\":1}").unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .is_err()
    );

    fs::remove_file(&b).unwrap();
    assert_eq!(
        with_timeout(rx.recv()).await,
        Some(MonitorEvent::FileChanged {
            path: b.clone(),
            body: None,
        })
    );

    let state = tokio::task::spawn_blocking(move || {
        let state = monitor.state().unwrap();
        drop(monitor);
        state
    })
    .await
    .unwrap();
    assert_eq!(state, MonitorState::Active);

    // The sink was dropped with the monitor.
    assert_eq!(with_timeout(rx.recv()).await, None);
}

/// Receive until `expected` arrives, returning everything seen on the way.
///
/// Writes are not atomic, so a file may briefly be observed empty before the
/// expected content shows up.
fn recv_until(
    rx: &crossbeam_channel::Receiver<MonitorEvent>,
    expected: &MonitorEvent,
) -> Vec<MonitorEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) => {
                let done = &event == expected;
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(_) => break,
        }
    }
    panic!("never received {expected:?}; saw {seen:?}");
}

fn body(bytes: &[u8]) -> Option<Arc<[u8]>> {
    Some(Arc::from(bytes))
}

fn assert_no_errors(events: &[MonitorEvent]) {
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, MonitorEvent::ErrorOccurred { .. })),
        "{events:?}"
    );
}

#[test]
fn removing_a_watched_subdirectory_keeps_the_monitor_running() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.json");
    let sub = dir.path().join("sub");
    let b = sub.join("b.json");
    fs::create_dir_all(&sub).unwrap();
    fs::write(&a, b"a0").unwrap();
    fs::write(&b, b"b0").unwrap();

    let (tx, rx) = crossbeam_channel::unbounded::<MonitorEvent>();
    let monitor = Monitor::new([a.clone(), b.clone()], tx).unwrap();
    monitor.start();
    recv_until(
        &rx,
        &MonitorEvent::FileChanged {
            path: b.clone(),
            body: body(b"b0"),
        },
    );

    fs::remove_dir_all(&sub).unwrap();
    let seen = recv_until(
        &rx,
        &MonitorEvent::FileChanged {
            path: b.clone(),
            body: None,
        },
    );
    assert_no_errors(&seen);

    // Let the fault recovery settle, then make sure the rest is still watched.
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(monitor.state().unwrap(), MonitorState::Active);
    let stray: Vec<_> = rx.try_iter().collect();
    assert_no_errors(&stray);

    fs::write(&a, b"a1").unwrap();
    let seen = recv_until(
        &rx,
        &MonitorEvent::FileChanged {
            path: a.clone(),
            body: body(b"a1"),
        },
    );
    assert_no_errors(&seen);

    // Bringing the directory back is picked up as well.
    fs::create_dir_all(&sub).unwrap();
    fs::write(&b, b"b1").unwrap();
    let seen = recv_until(
        &rx,
        &MonitorEvent::FileChanged {
            path: b.clone(),
            body: body(b"b1"),
        },
    );
    assert_no_errors(&seen);
    assert_eq!(monitor.state().unwrap(), MonitorState::Active);
}

#[test]
fn directory_created_after_start_is_picked_up() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let later = dir.path().join("later").join("conf");
    let file = later.join("a.json");
    let (tx, rx) = crossbeam_channel::unbounded::<MonitorEvent>();

    let monitor = Monitor::new([file.clone()], tx).unwrap();
    monitor.start();
    assert_eq!(monitor.state().unwrap(), MonitorState::Active);
    assert!(rx.try_recv().is_err());

    fs::create_dir_all(&later).unwrap();
    fs::write(&file, b"{}").unwrap();

    let seen = recv_until(
        &rx,
        &MonitorEvent::FileChanged {
            path: file.clone(),
            body: body(b"{}"),
        },
    );
    assert_no_errors(&seen);
    assert_eq!(monitor.state().unwrap(), MonitorState::Active);
}
