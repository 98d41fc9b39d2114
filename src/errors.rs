// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("at least one file must be watched")]
    NoWatchedFiles,

    #[error("failed to create change stream: {0}")]
    StreamCreationFailed(String),

    #[error("failed to start change stream: {0}")]
    StreamStartFailed(String),

    #[error("failed to spawn monitor worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("monitor worker is no longer running")]
    WorkerGone,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MonitorError>;
