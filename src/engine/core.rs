// src/engine/core.rs

//! Reconciliation engine state machine.
//!
//! `MonitorCore` owns every piece of mutable monitor state (snapshots, path
//! aliases, lifecycle state and the stream handle) and is only ever driven
//! from the worker thread, so none of it needs locking.
//!
//! ```text
//! Unregistered --start--> Registering --ok--> Active <--ok-- FaultedReregistering
//!      ^                       |                 |                   ^
//!      +--------failed---------+                 +------fault--------+
//!
//! any state --shutdown--> Destroyed
//! ```
//!
//! Entering `Active` always runs a resync pass: every watched file is
//! re-read and any difference from its snapshot is reported, because the
//! stream cannot be trusted to have seen changes made before (or while) it
//! was registered.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::engine::sink::NotificationSink;
use crate::engine::worker::Task;
use crate::fs::FileSystem;
use crate::types::{MonitorId, MonitorState, RawEvent};
use crate::watch::cache::FileContentCache;
use crate::watch::path_alias::{PathAliases, resolve_logical_path};
use crate::watch::registry;
use crate::watch::stream::{BatchDelivery, ChangeNotifier, EventStream};

pub(crate) struct MonitorCore {
    id: MonitorId,
    files: Arc<[PathBuf]>,
    directories: Arc<[PathBuf]>,
    coalesce_interval: Duration,
    state: MonitorState,
    stream: Option<Box<dyn EventStream>>,
    // Bumped on every registration; batches from older streams are stale.
    generation: u64,
    cache: FileContentCache,
    aliases: PathAliases,
    fs: Arc<dyn FileSystem>,
    notifier: Box<dyn ChangeNotifier>,
    sink: Box<dyn NotificationSink>,
    tasks: Sender<Task>,
}

/// Everything a core needs besides its own queue.
pub(crate) struct CoreParts {
    pub id: MonitorId,
    pub files: Arc<[PathBuf]>,
    pub directories: Arc<[PathBuf]>,
    pub coalesce_interval: Duration,
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Box<dyn ChangeNotifier>,
    pub sink: Box<dyn NotificationSink>,
}

impl MonitorCore {
    pub(crate) fn new(parts: CoreParts, tasks: Sender<Task>) -> Self {
        let cache = FileContentCache::new(&parts.files[..]);
        Self {
            id: parts.id,
            files: parts.files,
            directories: parts.directories,
            coalesce_interval: parts.coalesce_interval,
            state: MonitorState::Unregistered,
            stream: None,
            generation: 0,
            cache,
            aliases: PathAliases::new(),
            fs: parts.fs,
            notifier: parts.notifier,
            sink: parts.sink,
            tasks,
        }
    }

    pub(crate) fn id(&self) -> MonitorId {
        self.id
    }

    pub(crate) fn state(&self) -> MonitorState {
        self.state
    }

    pub(crate) fn start(&mut self) {
        if self.state != MonitorState::Unregistered {
            debug!(monitor = %self.id, state = ?self.state, "start ignored; already started");
            return;
        }

        self.state = MonitorState::Registering;
        if self.register_stream() {
            self.state = MonitorState::Active;
            info!(monitor = %self.id, files = self.files.len(), "monitor active");
            self.resync();
        } else {
            self.state = MonitorState::Unregistered;
        }
    }

    pub(crate) fn handle_batch(&mut self, generation: u64, events: Vec<RawEvent>) {
        if generation != self.generation || self.state != MonitorState::Active {
            debug!(
                monitor = %self.id,
                generation,
                current = self.generation,
                state = ?self.state,
                "dropping stale batch"
            );
            return;
        }

        let mut recovered = false;
        for event in events {
            if event.flags.is_fault() {
                // One recovery per batch: its resync covers every later fault.
                if !recovered {
                    self.recover_from_fault(&event);
                    recovered = true;
                }
                continue;
            }
            if self.state != MonitorState::Active {
                break;
            }
            self.handle_file_event(event);
        }
    }

    /// Emit `file_changed` for `path` with its current snapshot.
    pub(crate) fn replay(&mut self, path: &Path) {
        match self.cache.snapshot(path) {
            Some(body) => self.sink.file_changed(path, body),
            None => debug!(monitor = %self.id, ?path, "replay ignored; path is not watched"),
        }
    }

    pub(crate) fn shutdown(&mut self) {
        registry::erase(self.id);
        self.unregister_stream();
        self.state = MonitorState::Destroyed;
        info!(monitor = %self.id, "monitor destroyed");
    }

    fn handle_file_event(&mut self, event: RawEvent) {
        let Some(logical) =
            resolve_logical_path(self.fs.as_ref(), &self.files, &mut self.aliases, &event.path)
        else {
            return;
        };

        let update = self.cache.update(self.fs.as_ref(), &logical);
        if !update.changed {
            return;
        }
        if event.flags.is_own_event() {
            debug!(monitor = %self.id, path = ?logical, "suppressing self-generated change");
            return;
        }
        self.sink.file_changed(&logical, update.body);
    }

    fn recover_from_fault(&mut self, event: &RawEvent) {
        warn!(
            monitor = %self.id,
            path = ?event.path,
            flags = ?event.flags,
            "change stream fault; re-registering"
        );
        self.state = MonitorState::FaultedReregistering;
        self.unregister_stream();
        if self.register_stream() {
            self.state = MonitorState::Active;
            self.resync();
        } else {
            self.state = MonitorState::Unregistered;
        }
    }

    /// Re-read every watched file and report each one that differs from its
    /// snapshot. Self-generated suppression does not apply here.
    fn resync(&mut self) {
        self.aliases.seed(self.fs.as_ref(), &self.files);

        let files = Arc::clone(&self.files);
        let mut changed = 0usize;
        for file in files.iter() {
            let update = self.cache.update(self.fs.as_ref(), file);
            if update.changed {
                changed += 1;
                self.sink.file_changed(file, update.body);
            }
        }
        debug!(monitor = %self.id, changed, "resync pass complete");
    }

    fn register_stream(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }

        self.generation += 1;
        let delivery = BatchDelivery::new(self.id, self.generation, self.tasks.clone());

        let mut stream = match self.notifier.create_stream(
            &self.directories,
            self.coalesce_interval,
            delivery,
        ) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(monitor = %self.id, error = %err, "could not create change stream");
                self.sink.error_occurred(&err.to_string());
                return false;
            }
        };

        if let Err(err) = stream.start() {
            warn!(monitor = %self.id, error = %err, "could not start change stream");
            stream.stop();
            self.sink.error_occurred(&err.to_string());
            return false;
        }

        debug!(monitor = %self.id, generation = self.generation, "change stream registered");
        self.stream = Some(stream);
        true
    }

    fn unregister_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}
