//! A scriptable change-stream backend.
//!
//! `FakeNotifier` goes into the monitor; the cloned `FakeStreamControl` stays
//! with the test to inject batches and failures and to inspect what the
//! monitor did with its streams.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use contentmon::errors::{MonitorError, Result};
use contentmon::types::RawEvent;
use contentmon::watch::{BatchDelivery, ChangeNotifier, EventStream};

#[derive(Default)]
struct ControlState {
    fail_next_create: Option<String>,
    fail_next_start: Option<String>,
    // Directories of every successful creation, in order.
    created: Vec<Vec<PathBuf>>,
    intervals: Vec<Duration>,
    started: usize,
    stopped: usize,
    // Delivery handle of every started stream, in order.
    deliveries: Vec<BatchDelivery>,
    // Index into `deliveries` of the running stream, if any.
    running: Option<usize>,
}

#[derive(Clone, Default)]
pub struct FakeStreamControl {
    inner: Arc<Mutex<ControlState>>,
}

impl FakeStreamControl {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.lock().unwrap()
    }

    /// Make the next `create_stream` call fail with `message`.
    pub fn fail_next_create(&self, message: &str) {
        self.lock().fail_next_create = Some(message.to_string());
    }

    /// Make the next `EventStream::start` call fail with `message`.
    pub fn fail_next_start(&self, message: &str) {
        self.lock().fail_next_start = Some(message.to_string());
    }

    /// Deliver a batch through the running stream, on the calling thread.
    ///
    /// Returns `false` if no stream is running or the monitor refused it.
    pub fn emit(&self, events: Vec<RawEvent>) -> bool {
        let delivery = {
            let state = self.lock();
            state.running.map(|idx| state.deliveries[idx].clone())
        };
        match delivery {
            Some(delivery) => delivery.deliver(events),
            None => false,
        }
    }

    /// Like [`emit`](Self::emit), but from a freshly spawned thread, the way a
    /// native backend calls back.
    pub fn emit_from_thread(&self, events: Vec<RawEvent>) -> bool {
        let control = self.clone();
        thread::spawn(move || control.emit(events))
            .join()
            .unwrap()
    }

    /// Deliver through the `index`-th started stream even if it has been
    /// stopped since, to simulate batches racing a re-registration.
    pub fn emit_via(&self, index: usize, events: Vec<RawEvent>) -> bool {
        let delivery = self.lock().deliveries[index].clone();
        delivery.deliver(events)
    }

    pub fn created_count(&self) -> usize {
        self.lock().created.len()
    }

    pub fn started_count(&self) -> usize {
        self.lock().started
    }

    pub fn stopped_count(&self) -> usize {
        self.lock().stopped
    }

    pub fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    /// Directories passed to the most recent successful `create_stream`.
    pub fn last_directories(&self) -> Option<Vec<PathBuf>> {
        self.lock().created.last().cloned()
    }

    pub fn last_interval(&self) -> Option<Duration> {
        self.lock().intervals.last().copied()
    }

    /// Generations of every started stream, in start order.
    pub fn generations(&self) -> Vec<u64> {
        self.lock().deliveries.iter().map(|d| d.generation()).collect()
    }
}

/// [`ChangeNotifier`] driven by a [`FakeStreamControl`].
pub struct FakeNotifier {
    control: FakeStreamControl,
}

impl FakeNotifier {
    pub fn new() -> (Self, FakeStreamControl) {
        let control = FakeStreamControl::default();
        (
            Self {
                control: control.clone(),
            },
            control,
        )
    }
}

impl ChangeNotifier for FakeNotifier {
    fn create_stream(
        &mut self,
        directories: &[PathBuf],
        coalesce_interval: Duration,
        delivery: BatchDelivery,
    ) -> Result<Box<dyn EventStream>> {
        let mut state = self.control.lock();
        if let Some(message) = state.fail_next_create.take() {
            return Err(MonitorError::StreamCreationFailed(message));
        }
        state.created.push(directories.to_vec());
        state.intervals.push(coalesce_interval);
        Ok(Box::new(FakeEventStream {
            control: self.control.clone(),
            delivery: Some(delivery),
            index: None,
        }))
    }
}

struct FakeEventStream {
    control: FakeStreamControl,
    delivery: Option<BatchDelivery>,
    index: Option<usize>,
}

impl EventStream for FakeEventStream {
    fn start(&mut self) -> Result<()> {
        let mut state = self.control.lock();
        if let Some(message) = state.fail_next_start.take() {
            return Err(MonitorError::StreamStartFailed(message));
        }
        let Some(delivery) = self.delivery.take() else {
            return Err(MonitorError::StreamStartFailed("already started".to_string()));
        };
        state.started += 1;
        state.deliveries.push(delivery);
        let index = state.deliveries.len() - 1;
        state.running = Some(index);
        self.index = Some(index);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.control.lock();
        state.stopped += 1;
        if let Some(index) = self.index.take() {
            if state.running == Some(index) {
                state.running = None;
            }
        }
    }
}
