// src/engine/sink.rs

//! Consumer-facing notification interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::types::FileBody;

/// A notification emitted by a monitor, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A watched file's content changed. `body` is `None` when the file no
    /// longer exists.
    FileChanged {
        path: PathBuf,
        body: Option<FileBody>,
    },
    /// The change stream could not be created or started.
    ErrorOccurred { message: String },
}

/// Receives monitor notifications.
///
/// Both methods are called on the monitor's worker thread, in order. They
/// should return quickly; slow consumers should forward to a channel (see the
/// implementations for channel senders).
pub trait NotificationSink: Send + 'static {
    fn file_changed(&self, path: &Path, body: Option<FileBody>);

    fn error_occurred(&self, message: &str);
}

impl NotificationSink for tokio::sync::mpsc::UnboundedSender<MonitorEvent> {
    fn file_changed(&self, path: &Path, body: Option<FileBody>) {
        let event = MonitorEvent::FileChanged {
            path: path.to_path_buf(),
            body,
        };
        if self.send(event).is_err() {
            debug!(?path, "notification receiver dropped");
        }
    }

    fn error_occurred(&self, message: &str) {
        let event = MonitorEvent::ErrorOccurred {
            message: message.to_string(),
        };
        if self.send(event).is_err() {
            debug!(message, "notification receiver dropped");
        }
    }
}

impl NotificationSink for crossbeam_channel::Sender<MonitorEvent> {
    fn file_changed(&self, path: &Path, body: Option<FileBody>) {
        let event = MonitorEvent::FileChanged {
            path: path.to_path_buf(),
            body,
        };
        if self.send(event).is_err() {
            debug!(?path, "notification receiver dropped");
        }
    }

    fn error_occurred(&self, message: &str) {
        let event = MonitorEvent::ErrorOccurred {
            message: message.to_string(),
        };
        if self.send(event).is_err() {
            debug!(message, "notification receiver dropped");
        }
    }
}

impl<S: NotificationSink + Sync> NotificationSink for Arc<S> {
    fn file_changed(&self, path: &Path, body: Option<FileBody>) {
        (**self).file_changed(path, body);
    }

    fn error_occurred(&self, message: &str) {
        (**self).error_occurred(message);
    }
}

impl NotificationSink for Box<dyn NotificationSink> {
    fn file_changed(&self, path: &Path, body: Option<FileBody>) {
        (**self).file_changed(path, body);
    }

    fn error_occurred(&self, message: &str) {
        (**self).error_occurred(message);
    }
}
