// src/engine/worker.rs

//! The monitor's sequential execution context: one named thread draining one
//! FIFO queue. Every piece of mutable engine state lives on this thread.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, trace};

use crate::engine::core::MonitorCore;
use crate::errors::{MonitorError, Result};
use crate::types::{MonitorId, MonitorState, RawEvent};
use crate::watch::registry;

/// Work items executed on the worker, strictly in submission order.
#[derive(Debug)]
pub(crate) enum Task {
    /// Register the change stream if not already registered.
    Start,
    /// A coalesced batch from the stream with the given registration
    /// generation.
    Batch {
        generation: u64,
        events: Vec<RawEvent>,
    },
    /// Re-emit the current snapshot of a watched path.
    Replay { path: PathBuf },
    /// Report the current state once everything queued before has run.
    Query { reply: Sender<MonitorState> },
    /// Leave the liveness registry, release the stream and exit.
    Shutdown,
}

/// Spawn the worker thread for `core`.
///
/// Returns once the monitor is registered as live, which happens on the
/// worker itself. If the thread cannot be spawned nothing was registered.
pub(crate) fn spawn_worker(
    name: &str,
    id: MonitorId,
    mut core: MonitorCore,
    tasks: Receiver<Task>,
) -> Result<JoinHandle<()>> {
    let (ready_tx, ready_rx) = bounded::<()>(1);

    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            registry::insert(id);
            let _ = ready_tx.send(());
            run(&mut core, tasks);
        })
        .map_err(MonitorError::WorkerSpawn)?;

    ready_rx.recv().map_err(|_| MonitorError::WorkerGone)?;
    debug!(monitor = %id, "monitor worker running");
    Ok(handle)
}

fn run(core: &mut MonitorCore, tasks: Receiver<Task>) {
    while let Ok(task) = tasks.recv() {
        trace!(monitor = %core.id(), ?task, "worker task");
        match task {
            Task::Start => core.start(),
            Task::Batch { generation, events } => core.handle_batch(generation, events),
            Task::Replay { path } => core.replay(&path),
            Task::Query { reply } => {
                let _ = reply.send(core.state());
            }
            Task::Shutdown => {
                core.shutdown();
                break;
            }
        }
    }
    debug!(monitor = %core.id(), "monitor worker exiting");
}
