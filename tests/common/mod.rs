#![allow(dead_code)]

pub use contentmon_test_utils::*;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use contentmon::engine::{Monitor, MonitorEvent};
use contentmon::fs::mock::MockFileSystem;
use contentmon::types::MonitorState;

/// A monitor over a mock filesystem and a scripted change stream.
pub struct Fixture {
    pub monitor: Monitor,
    pub fs: MockFileSystem,
    pub control: FakeStreamControl,
    pub recorder: Recorder,
}

impl Fixture {
    pub fn new(files: &[&str], fs: MockFileSystem) -> Self {
        init_tracing();
        let (notifier, control) = FakeNotifier::new();
        let (sink, recorder) = RecordingSink::new();
        let monitor = Monitor::builder(files.iter().copied())
            .coalesce_interval(Duration::from_millis(10))
            .notifier(notifier)
            .file_system(Arc::new(fs.clone()))
            .build(sink)
            .unwrap();
        Self {
            monitor,
            fs,
            control,
            recorder,
        }
    }

    /// `new` + `start`, waiting until the start resync has run.
    pub fn started(files: &[&str], fs: MockFileSystem) -> Self {
        let fixture = Self::new(files, fs);
        fixture.monitor.start();
        assert_eq!(fixture.settle(), MonitorState::Active);
        fixture
    }

    /// Wait for everything queued so far and return the resulting state.
    pub fn settle(&self) -> MonitorState {
        self.monitor.state().unwrap()
    }

    /// Wait for everything queued so far and return what was emitted.
    pub fn drain(&self) -> Vec<MonitorEvent> {
        self.settle();
        self.recorder.drain()
    }
}

pub fn changed(path: &str, body: &[u8]) -> MonitorEvent {
    MonitorEvent::FileChanged {
        path: PathBuf::from(path),
        body: Some(Arc::from(body)),
    }
}

pub fn removed(path: &str) -> MonitorEvent {
    MonitorEvent::FileChanged {
        path: PathBuf::from(path),
        body: None,
    }
}
