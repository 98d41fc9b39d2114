//! A notification sink that records into a channel and can run a hook on the
//! worker thread.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contentmon::engine::{MonitorEvent, NotificationSink};
use contentmon::types::FileBody;
use crossbeam_channel::{Receiver, Sender, unbounded};

type Hook = Box<dyn FnMut(&MonitorEvent) + Send>;

pub struct RecordingSink {
    tx: Sender<MonitorEvent>,
    hook: Arc<Mutex<Option<Hook>>>,
}

/// Test side of a [`RecordingSink`].
pub struct Recorder {
    rx: Receiver<MonitorEvent>,
    hook: Arc<Mutex<Option<Hook>>>,
}

impl RecordingSink {
    pub fn new() -> (Self, Recorder) {
        let (tx, rx) = unbounded();
        let hook = Arc::new(Mutex::new(None));
        (
            Self {
                tx,
                hook: Arc::clone(&hook),
            },
            Recorder { rx, hook },
        )
    }

    fn record(&self, event: MonitorEvent) {
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook(&event);
        }
        let _ = self.tx.send(event);
    }
}

impl NotificationSink for RecordingSink {
    fn file_changed(&self, path: &Path, body: Option<FileBody>) {
        self.record(MonitorEvent::FileChanged {
            path: path.to_path_buf(),
            body,
        });
    }

    fn error_occurred(&self, message: &str) {
        self.record(MonitorEvent::ErrorOccurred {
            message: message.to_string(),
        });
    }
}

impl Recorder {
    /// Run `hook` on the worker thread before each event is recorded.
    pub fn set_hook(&self, hook: impl FnMut(&MonitorEvent) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Everything recorded so far.
    pub fn drain(&self) -> Vec<MonitorEvent> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next(&self, timeout: Duration) -> Option<MonitorEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}
