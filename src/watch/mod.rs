// src/watch/mod.rs

//! File watching building blocks.
//!
//! This module is responsible for:
//! - Deriving the directories to subscribe to (`path_set`).
//! - The change-stream seam and its `notify` implementation (`stream`,
//!   `notify_stream`).
//! - The process-wide liveness registry consulted by stream callbacks
//!   (`registry`).
//! - Content snapshots and byte-exact change detection (`cache`).
//! - Mapping OS-reported paths back to logical paths (`path_alias`).
//!
//! It does **not** own any threads of the monitor itself; the engine drives
//! all of this from its worker.

pub mod cache;
pub mod notify_stream;
pub mod path_alias;
pub mod path_set;
pub mod registry;
pub mod stream;

pub use cache::{ContentUpdate, FileContentCache};
pub use notify_stream::NotifyChangeNotifier;
pub use path_alias::{PathAliases, resolve_logical_path};
pub use path_set::watched_directories;
pub use stream::{BatchDelivery, ChangeNotifier, EventStream};
