// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MonitorError, Result};

/// Upper bound for the coalescing window; anything longer makes reloads
/// feel broken.
const MAX_COALESCE_MS: u64 = 10_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MonitorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.monitor))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_files(cfg)?;
    validate_monitor_settings(cfg)?;
    Ok(())
}

fn validate_files(cfg: &RawConfigFile) -> Result<()> {
    if cfg.monitor.files.is_empty() {
        return Err(MonitorError::ConfigError(
            "[monitor].files must list at least one file".to_string(),
        ));
    }
    if let Some(idx) = cfg.monitor.files.iter().position(|f| f.trim().is_empty()) {
        return Err(MonitorError::ConfigError(format!(
            "[monitor].files[{idx}] is empty"
        )));
    }
    Ok(())
}

fn validate_monitor_settings(cfg: &RawConfigFile) -> Result<()> {
    let ms = cfg.monitor.coalesce_ms;
    if ms == 0 || ms > MAX_COALESCE_MS {
        return Err(MonitorError::ConfigError(format!(
            "[monitor].coalesce_ms must be within 1..={MAX_COALESCE_MS} (got {ms})"
        )));
    }
    if cfg.monitor.worker_name.trim().is_empty() {
        return Err(MonitorError::ConfigError(
            "[monitor].worker_name must not be empty".to_string(),
        ));
    }
    Ok(())
}
