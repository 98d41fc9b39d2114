// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{DEFAULT_COALESCE_INTERVAL, DEFAULT_WORKER_NAME, MonitorOptions};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [monitor]
/// files = ["/etc/app/a.json", "/etc/app/sub/b.json"]
/// coalesce_ms = 100
/// worker_name = "contentmon-worker"
/// ```
///
/// Everything except `files` has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub monitor: MonitorSection,
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Files to watch. Fixed for the lifetime of the monitor.
    #[serde(default)]
    pub files: Vec<String>,

    /// Coalescing window of the change stream, in milliseconds.
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,

    /// Name of the monitor's worker thread.
    #[serde(default = "default_worker_name")]
    pub worker_name: String,
}

fn default_coalesce_ms() -> u64 {
    DEFAULT_COALESCE_INTERVAL.as_millis() as u64
}

fn default_worker_name() -> String {
    DEFAULT_WORKER_NAME.to_string()
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            coalesce_ms: default_coalesce_ms(),
            worker_name: default_worker_name(),
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)` or
/// [`load_and_validate`](super::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub monitor: MonitorSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(monitor: MonitorSection) -> Self {
        Self { monitor }
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.monitor.files.iter().map(PathBuf::from).collect()
    }

    pub fn options(&self) -> MonitorOptions {
        MonitorOptions {
            coalesce_interval: Duration::from_millis(self.monitor.coalesce_ms),
            worker_name: self.monitor.worker_name.clone(),
        }
    }
}
