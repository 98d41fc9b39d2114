// src/types.rs

//! Small value types shared by the watch layer and the engine.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Full content of a watched file, shared between the snapshot cache and
/// every notification that reports it.
pub type FileBody = Arc<[u8]>;

/// Opaque identity of a monitor instance.
///
/// Ids are allocated from a process-wide counter and never reused, so a stale
/// id can never alias a newer monitor in the liveness registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(u64);

static NEXT_MONITOR_ID: AtomicU64 = AtomicU64::new(1);

impl MonitorId {
    pub fn next() -> Self {
        MonitorId(NEXT_MONITOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor-{}", self.0)
    }
}

/// Per-event flag bitset carried by a [`RawEvent`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventFlags(u32);

impl EventFlags {
    pub const NONE: EventFlags = EventFlags(0);
    /// The subscribed directory itself was moved, removed or replaced.
    pub const ROOT_CHANGED: EventFlags = EventFlags(1 << 0);
    /// The kernel (or backend) dropped events; the stream is no longer reliable.
    pub const KERNEL_DROPPED: EventFlags = EventFlags(1 << 1);
    /// The delivering side observed a drop or an error on its own end.
    pub const USER_DROPPED: EventFlags = EventFlags(1 << 2);
    /// The change was produced by this process.
    pub const OWN_EVENT: EventFlags = EventFlags(1 << 3);
    /// The event describes a file rather than a directory.
    pub const ITEM_IS_FILE: EventFlags = EventFlags(1 << 4);

    const FAULT: EventFlags = EventFlags(
        Self::ROOT_CHANGED.0 | Self::KERNEL_DROPPED.0 | Self::USER_DROPPED.0,
    );

    const NAMES: [(EventFlags, &'static str); 5] = [
        (Self::ROOT_CHANGED, "ROOT_CHANGED"),
        (Self::KERNEL_DROPPED, "KERNEL_DROPPED"),
        (Self::USER_DROPPED, "USER_DROPPED"),
        (Self::OWN_EVENT, "OWN_EVENT"),
        (Self::ITEM_IS_FILE, "ITEM_IS_FILE"),
    ];

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: EventFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(self, other: EventFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Root-changed, kernel-dropped or user-dropped: the stream must be
    /// re-registered and every watched file re-checked.
    pub const fn is_fault(self) -> bool {
        self.intersects(Self::FAULT)
    }

    pub const fn is_own_event(self) -> bool {
        self.contains(Self::OWN_EVENT)
    }
}

impl BitOr for EventFlags {
    type Output = EventFlags;

    fn bitor(self, rhs: EventFlags) -> EventFlags {
        EventFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventFlags {
    fn bitor_assign(&mut self, rhs: EventFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("EventFlags(NONE)");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "EventFlags({})", names.join(" | "))
    }
}

/// One native change notification: the path as reported by the OS plus flags.
///
/// Raw events are never persisted; they live only as long as the batch that
/// carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub flags: EventFlags,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, flags: EventFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }

    /// A plain file-level change.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventFlags::ITEM_IS_FILE)
    }
}

/// Lifecycle state of the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Constructed, no stream registered (also the state after a failed
    /// registration).
    Unregistered,
    /// Creating and starting the change stream.
    Registering,
    /// Stream running; file events are being reconciled.
    Active,
    /// A fault was observed; the stream is being torn down and recreated.
    FaultedReregistering,
    /// Terminal.
    Destroyed,
}
