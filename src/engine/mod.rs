// src/engine/mod.rs

//! The file content monitor.
//!
//! A [`Monitor`] watches a fixed list of files and reports content changes
//! (not raw write events) through a [`NotificationSink`]. All engine state
//! lives on one dedicated worker thread per monitor:
//! - `core` holds the reconciliation state machine,
//! - `worker` is the thread + FIFO queue that drives it,
//! - [`sink`] is the consumer-facing notification interface.
//!
//! Dropping a `Monitor` blocks until the worker has drained everything queued
//! before the drop, released the change stream and exited.

pub(crate) mod core;
pub mod sink;
pub(crate) mod worker;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, unbounded};
use tracing::{debug, warn};

use crate::errors::{MonitorError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{MonitorId, MonitorState};
use crate::watch::notify_stream::NotifyChangeNotifier;
use crate::watch::path_set::watched_directories;
use crate::watch::stream::ChangeNotifier;

use self::core::{CoreParts, MonitorCore};
use self::worker::{Task, spawn_worker};

pub use sink::{MonitorEvent, NotificationSink};

/// Default coalescing window for the change stream.
pub const DEFAULT_COALESCE_INTERVAL: Duration = Duration::from_millis(100);

/// Default name of the per-monitor worker thread.
pub const DEFAULT_WORKER_NAME: &str = "contentmon-worker";

/// Tunables fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Window during which native events are merged into one batch.
    pub coalesce_interval: Duration,
    /// Thread name of the monitor's worker.
    pub worker_name: String,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            coalesce_interval: DEFAULT_COALESCE_INTERVAL,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

/// Builder for a [`Monitor`] with a non-default backend, filesystem or
/// options.
pub struct MonitorBuilder {
    files: Vec<PathBuf>,
    options: MonitorOptions,
    notifier: Option<Box<dyn ChangeNotifier>>,
    fs: Option<Arc<dyn FileSystem>>,
}

impl MonitorBuilder {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            options: MonitorOptions::default(),
            notifier: None,
            fs: None,
        }
    }

    pub fn options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn coalesce_interval(mut self, interval: Duration) -> Self {
        self.options.coalesce_interval = interval;
        self
    }

    pub fn notifier(mut self, notifier: impl ChangeNotifier) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Spawn the worker and register the monitor as live.
    ///
    /// Fails with [`MonitorError::NoWatchedFiles`] for an empty file list and
    /// [`MonitorError::WorkerSpawn`] if the worker thread cannot be created;
    /// in both cases nothing was registered.
    pub fn build(self, sink: impl NotificationSink) -> Result<Monitor> {
        if self.files.is_empty() {
            return Err(MonitorError::NoWatchedFiles);
        }

        let id = MonitorId::next();
        let files: Arc<[PathBuf]> = self.files.into();
        let directories: Arc<[PathBuf]> = watched_directories(&files[..]).into();

        let (tasks_tx, tasks_rx) = unbounded::<Task>();
        let core = MonitorCore::new(
            CoreParts {
                id,
                files: Arc::clone(&files),
                directories: Arc::clone(&directories),
                coalesce_interval: self.options.coalesce_interval,
                fs: self.fs.unwrap_or_else(|| Arc::new(RealFileSystem)),
                notifier: self
                    .notifier
                    .unwrap_or_else(|| Box::new(NotifyChangeNotifier::new())),
                sink: Box::new(sink),
            },
            tasks_tx.clone(),
        );

        let worker = spawn_worker(&self.options.worker_name, id, core, tasks_rx)?;
        debug!(monitor = %id, ?files, ?directories, "monitor constructed");

        Ok(Monitor {
            id,
            files,
            directories,
            tasks: tasks_tx,
            worker: Some(worker),
        })
    }
}

/// Watches a fixed set of files and reports content changes.
///
/// ```no_run
/// use contentmon::engine::{Monitor, MonitorEvent};
///
/// let (tx, rx) = crossbeam_channel::unbounded::<MonitorEvent>();
/// let monitor = Monitor::new(["/etc/app/config.json"], tx)?;
/// monitor.start();
/// for event in rx.iter() {
///     println!("{event:?}");
/// }
/// # Ok::<(), contentmon::errors::MonitorError>(())
/// ```
pub struct Monitor {
    id: MonitorId,
    files: Arc<[PathBuf]>,
    directories: Arc<[PathBuf]>,
    tasks: Sender<Task>,
    worker: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Monitor `files` with the platform change stream and default options.
    pub fn new<I, P>(files: I, sink: impl NotificationSink) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        MonitorBuilder::new(files).build(sink)
    }

    pub fn builder<I, P>(files: I) -> MonitorBuilder
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        MonitorBuilder::new(files)
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    pub fn watched_files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn watched_directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Schedule stream registration. Non-blocking; a no-op once the monitor
    /// is registering or active.
    pub fn start(&self) {
        self.enqueue(Task::Start);
    }

    /// Re-emit `file_changed` for `path` with its last known content.
    ///
    /// Paths outside the watched set are ignored.
    pub fn enqueue_file_changed(&self, path: impl AsRef<Path>) {
        self.enqueue(Task::Replay {
            path: path.as_ref().to_path_buf(),
        });
    }

    /// Current lifecycle state.
    ///
    /// Blocks until every task queued before this call has run, so it also
    /// works as a barrier.
    pub fn state(&self) -> Result<MonitorState> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tasks
            .send(Task::Query { reply: reply_tx })
            .map_err(|_| MonitorError::WorkerGone)?;
        reply_rx.recv().map_err(|_| MonitorError::WorkerGone)
    }

    fn enqueue(&self, task: Task) {
        if self.tasks.send(task).is_err() {
            warn!(monitor = %self.id, "monitor worker is gone; task dropped");
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        let _ = self.tasks.send(Task::Shutdown);
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Dropped from one of our own callbacks: the worker exits after the
        // current task, joining here would wait on ourselves.
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!(monitor = %self.id, "monitor worker panicked");
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("id", &self.id)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}
