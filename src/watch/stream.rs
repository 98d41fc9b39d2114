// src/watch/stream.rs

//! Platform change-stream abstraction.
//!
//! The engine only ever sees these two traits plus [`BatchDelivery`]. A
//! backend subscribes to a set of directories, coalesces native events for
//! the requested interval and hands each batch to the delivery handle from
//! whatever thread it owns. Production uses
//! [`NotifyChangeNotifier`](super::notify_stream::NotifyChangeNotifier); tests
//! provide scripted backends.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::trace;

use crate::engine::worker::Task;
use crate::errors::Result;
use crate::types::{MonitorId, RawEvent};
use crate::watch::registry;

/// Factory for change streams (one per registration).
pub trait ChangeNotifier: Send + 'static {
    /// Create a stream over `directories` (recursive) that coalesces native
    /// events for `coalesce_interval` and hands batches to `delivery`.
    ///
    /// Must not deliver anything before [`EventStream::start`] succeeds.
    /// Errors should be [`MonitorError::StreamCreationFailed`](crate::errors::MonitorError::StreamCreationFailed).
    fn create_stream(
        &mut self,
        directories: &[PathBuf],
        coalesce_interval: Duration,
        delivery: BatchDelivery,
    ) -> Result<Box<dyn EventStream>>;
}

/// A created change stream.
pub trait EventStream: Send {
    /// Begin delivering batches. Errors should be
    /// [`MonitorError::StreamStartFailed`](crate::errors::MonitorError::StreamStartFailed).
    fn start(&mut self) -> Result<()>;

    /// Stop delivering and release native resources. Idempotent; once it
    /// returns, the backend's own threads no longer touch the delivery handle.
    fn stop(&mut self);
}

/// Trampoline from a backend's delivery thread into a monitor's worker.
///
/// It performs no engine logic: it checks the liveness registry and, if the
/// monitor is still alive, enqueues the whole batch as one task. Batches keep
/// their arrival order because the worker queue is FIFO.
#[derive(Clone)]
pub struct BatchDelivery {
    monitor: MonitorId,
    generation: u64,
    tasks: Sender<Task>,
}

impl BatchDelivery {
    pub(crate) fn new(monitor: MonitorId, generation: u64, tasks: Sender<Task>) -> Self {
        Self {
            monitor,
            generation,
            tasks,
        }
    }

    pub fn monitor(&self) -> MonitorId {
        self.monitor
    }

    /// Registration counter of the stream this handle was issued to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hand a batch to the monitor. Returns `false` if it was dropped because
    /// the monitor is being (or has been) destroyed.
    pub fn deliver(&self, events: Vec<RawEvent>) -> bool {
        if !registry::is_alive(self.monitor) {
            trace!(monitor = %self.monitor, "monitor gone; dropping batch");
            return false;
        }
        if events.is_empty() {
            return true;
        }
        self.tasks
            .send(Task::Batch {
                generation: self.generation,
                events,
            })
            .is_ok()
    }
}

impl fmt::Debug for BatchDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDelivery")
            .field("monitor", &self.monitor)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
