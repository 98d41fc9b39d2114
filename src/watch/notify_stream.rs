// src/watch/notify_stream.rs

//! Change stream backed by the cross-platform `notify` crate.
//!
//! `notify` hands us events one at a time on its own thread. A small
//! coalescing thread per stream collects everything that arrives within the
//! coalescing window after the first event, translates it into [`RawEvent`]s
//! and hands the batch to the monitor through [`BatchDelivery`].
//!
//! A subscribed directory that does not exist (yet, or any more) does not
//! fail the stream. Its nearest existing ancestor is watched instead, and any
//! event on the path leading down to the missing directory is reported as
//! [`EventFlags::ROOT_CHANGED`], so the monitor re-registers once it appears.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, trace, warn};

use crate::errors::{MonitorError, Result};
use crate::types::{EventFlags, RawEvent};
use crate::watch::stream::{BatchDelivery, ChangeNotifier, EventStream};

type NotifyResult = notify::Result<Event>;

/// [`ChangeNotifier`] for the platform's recommended watcher (inotify,
/// FSEvents, ReadDirectoryChangesW, kqueue).
#[derive(Debug, Clone, Default)]
pub struct NotifyChangeNotifier;

impl NotifyChangeNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeNotifier for NotifyChangeNotifier {
    fn create_stream(
        &mut self,
        directories: &[PathBuf],
        coalesce_interval: Duration,
        delivery: BatchDelivery,
    ) -> Result<Box<dyn EventStream>> {
        let (raw_tx, raw_rx) = unbounded::<NotifyResult>();

        let watcher = RecommendedWatcher::new(
            move |res: NotifyResult| {
                // Receiver is gone only after the stream stopped.
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )
        .map_err(|err| MonitorError::StreamCreationFailed(err.to_string()))?;

        Ok(Box::new(NotifyEventStream {
            directories: directories.to_vec(),
            coalesce_interval,
            watcher: Some(watcher),
            pending: Some((raw_rx, delivery)),
            stop_tx: None,
            coalescer: None,
        }))
    }
}

/// What a started stream watches, in every spelling a backend may report.
#[derive(Debug, Default)]
struct Subscription {
    /// Subscribed directories that exist and are watched recursively.
    roots: Vec<PathBuf>,
    /// Missing subscribed directories as `(anchor, directory)`, where
    /// `anchor` is the nearest existing ancestor.
    missing: Vec<(PathBuf, PathBuf)>,
}

impl Subscription {
    fn is_root(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| root.as_path() == path)
    }

    /// `path` lies strictly below an anchor on the way to a missing
    /// directory, so its appearance can make that directory watchable.
    fn leads_to_missing(&self, path: &Path) -> bool {
        self.missing.iter().any(|(anchor, dir)| {
            path != anchor && path.starts_with(anchor) && dir.starts_with(path)
        })
    }
}

struct NotifyEventStream {
    directories: Vec<PathBuf>,
    coalesce_interval: Duration,
    watcher: Option<RecommendedWatcher>,
    // Handed to the coalescing thread on start.
    pending: Option<(Receiver<NotifyResult>, BatchDelivery)>,
    stop_tx: Option<Sender<()>>,
    coalescer: Option<JoinHandle<()>>,
}

impl NotifyEventStream {
    fn subscribe(&mut self) -> Result<Subscription> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Err(MonitorError::StreamStartFailed(
                "stream was already stopped".to_string(),
            ));
        };

        let mut watched: Vec<PathBuf> = Vec::new();
        let mut missing: Vec<PathBuf> = Vec::new();
        for dir in &self.directories {
            match watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(()) => watched.push(dir.clone()),
                Err(_) if !dir.exists() => missing.push(dir.clone()),
                Err(err) => {
                    return Err(MonitorError::StreamStartFailed(format!(
                        "watching {:?}: {err}",
                        dir
                    )));
                }
            }
        }

        let mut anchors: Vec<PathBuf> = Vec::new();
        let mut subscription = Subscription::default();
        for dir in &missing {
            let anchor = nearest_existing_ancestor(dir);
            let covered =
                watched.iter().any(|w| anchor.starts_with(w)) || anchors.contains(&anchor);
            if !covered {
                watcher
                    .watch(&anchor, RecursiveMode::NonRecursive)
                    .map_err(|err| {
                        MonitorError::StreamStartFailed(format!("watching {:?}: {err}", anchor))
                    })?;
                anchors.push(anchor.clone());
            }
            debug!(directory = ?dir, ?anchor, "directory missing; watching nearest ancestor");

            subscription
                .missing
                .extend(spellings(&anchor, &anchor).into_iter().zip(spellings(dir, &anchor)));
        }

        for dir in &watched {
            subscription.roots.extend(spellings(dir, dir));
        }
        Ok(subscription)
    }
}

impl EventStream for NotifyEventStream {
    fn start(&mut self) -> Result<()> {
        if self.pending.is_none() {
            return Err(MonitorError::StreamStartFailed(
                "stream was already started".to_string(),
            ));
        }

        let subscription = self.subscribe()?;

        let Some((raw_rx, delivery)) = self.pending.take() else {
            return Err(MonitorError::StreamStartFailed(
                "stream was already started".to_string(),
            ));
        };
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = self.coalesce_interval;
        let missing = subscription.missing.len();

        let handle = thread::Builder::new()
            .name("contentmon-stream".to_string())
            .spawn(move || run_coalescer(raw_rx, stop_rx, interval, subscription, delivery))
            .map_err(|err| MonitorError::StreamStartFailed(err.to_string()))?;

        self.stop_tx = Some(stop_tx);
        self.coalescer = Some(handle);

        info!(directories = ?self.directories, missing, ?interval, "change stream started");
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the watcher unsubscribes every directory.
        let had_watcher = self.watcher.take().is_some();
        self.pending = None;
        drop(self.stop_tx.take());
        if let Some(handle) = self.coalescer.take() {
            if handle.join().is_err() {
                warn!("coalescing thread panicked");
            }
        }
        if had_watcher {
            debug!(directories = ?self.directories, "change stream stopped");
        }
    }
}

impl Drop for NotifyEventStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Closest ancestor of `dir` (or `dir` itself) that exists right now.
fn nearest_existing_ancestor(dir: &Path) -> PathBuf {
    let mut current = dir;
    loop {
        if current.exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent,
            _ if dir.is_absolute() => return PathBuf::from("/"),
            _ => return PathBuf::from("."),
        }
    }
}

/// `dir` as given, made absolute, and resolved through the canonical form of
/// `anchor` (an existing ancestor), which is how some backends report it.
///
/// Always three entries so spellings of a directory and of its anchor line up.
fn spellings(dir: &Path, anchor: &Path) -> Vec<PathBuf> {
    let absolute = if dir.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    } else {
        dir.to_path_buf()
    };
    let canonical = match fs::canonicalize(anchor) {
        Ok(canon) => match dir.strip_prefix(anchor) {
            Ok(rest) if !rest.as_os_str().is_empty() => canon.join(rest),
            Ok(_) => canon,
            Err(_) => canon.join(dir),
        },
        Err(_) => absolute.clone(),
    };
    vec![dir.to_path_buf(), absolute, canonical]
}

enum Next {
    Event(NotifyResult),
    WindowElapsed,
    Closed,
}

fn run_coalescer(
    raw_rx: Receiver<NotifyResult>,
    stop_rx: Receiver<()>,
    interval: Duration,
    subscription: Subscription,
    delivery: BatchDelivery,
) {
    loop {
        let next = select! {
            recv(stop_rx) -> _ => Next::Closed,
            recv(raw_rx) -> msg => msg.map_or(Next::Closed, Next::Event),
        };
        let Next::Event(first) = next else {
            return;
        };

        let mut batch = Vec::new();
        translate(first, &subscription, &mut batch);

        let deadline = Instant::now() + interval;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let next = select! {
                recv(stop_rx) -> _ => Next::Closed,
                recv(raw_rx) -> msg => msg.map_or(Next::Closed, Next::Event),
                default(remaining) => Next::WindowElapsed,
            };
            match next {
                Next::Event(res) => translate(res, &subscription, &mut batch),
                Next::WindowElapsed => break,
                Next::Closed => return,
            }
        }

        if batch.is_empty() {
            continue;
        }
        trace!(len = batch.len(), "delivering coalesced batch");
        if !delivery.deliver(batch) {
            debug!(monitor = %delivery.monitor(), "monitor no longer accepts batches");
            return;
        }
    }
}

/// Convert one `notify` result into zero or more raw events.
fn translate(res: NotifyResult, subscription: &Subscription, out: &mut Vec<RawEvent>) {
    let event = match res {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "change stream reported an error");
            let path = err.paths.first().cloned().unwrap_or_default();
            out.push(RawEvent::new(path, EventFlags::USER_DROPPED));
            return;
        }
    };

    if event.need_rescan() {
        let path = event.paths.first().cloned().unwrap_or_default();
        out.push(RawEvent::new(path, EventFlags::KERNEL_DROPPED));
        return;
    }

    if !is_content_relevant(&event.kind) {
        return;
    }

    let is_directory = matches!(
        event.kind,
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder)
    );
    let moves_or_removes = matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );

    for path in event.paths {
        let flags = if subscription.leads_to_missing(&path)
            || (moves_or_removes && subscription.is_root(&path))
        {
            EventFlags::ROOT_CHANGED
        } else if is_directory {
            EventFlags::NONE
        } else {
            EventFlags::ITEM_IS_FILE
        };
        out.push(RawEvent::new(path, flags));
    }
}

/// Reads of watched files must not feed back into the stream.
fn is_content_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}
