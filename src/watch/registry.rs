// src/watch/registry.rs

//! Process-wide table of live monitor instances.
//!
//! Membership is written only from a monitor's own worker thread: inserted
//! when construction completes, erased as the first step of destruction. The
//! stream trampoline reads it from whatever thread the platform delivers on
//! and drops the batch when the instance is no longer live.

use dashmap::DashSet;
use std::sync::LazyLock;

use crate::types::MonitorId;

static LIVE_MONITORS: LazyLock<DashSet<MonitorId>> = LazyLock::new(DashSet::new);

pub fn insert(id: MonitorId) {
    LIVE_MONITORS.insert(id);
}

pub fn erase(id: MonitorId) {
    LIVE_MONITORS.remove(&id);
}

/// Whether `id` is registered. Erased and never-inserted ids both read dead.
#[inline]
pub fn is_alive(id: MonitorId) -> bool {
    LIVE_MONITORS.contains(&id)
}
