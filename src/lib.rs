// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_from_path;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::{Monitor, MonitorEvent, MonitorOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (with CLI overrides)
/// - one monitor feeding an unbounded channel
/// - printing notifications until Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let (files, options) = resolve_settings(&args)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<MonitorEvent>();
    let monitor = Monitor::builder(files).options(options).build(tx)?;
    monitor.start();
    info!(
        monitor = %monitor.id(),
        files = ?monitor.watched_files(),
        directories = ?monitor.watched_directories(),
        "watching for content changes"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("shutdown requested");
                break;
            }
            event = rx.recv() => match event {
                Some(MonitorEvent::ErrorOccurred { message }) => {
                    error!(%message, "monitor reported an error");
                }
                Some(event) => {
                    if let Some(line) = describe(&event, args.print_body) {
                        println!("{line}");
                    }
                }
                None => break,
            },
        }
    }

    // Dropping joins the worker thread; keep that off the async runtime.
    tokio::task::spawn_blocking(move || drop(monitor)).await?;
    Ok(())
}

/// Merge the config file with CLI overrides and validate the result.
///
/// The config file is optional when files are given on the command line.
fn resolve_settings(args: &CliArgs) -> Result<(Vec<PathBuf>, MonitorOptions)> {
    let config_path = PathBuf::from(&args.config);

    let mut raw = if config_path.exists() {
        load_from_path(&config_path)?
    } else if args.files.is_empty() {
        bail!(
            "config file {} not found and no files given on the command line",
            config_path.display()
        );
    } else {
        RawConfigFile::default()
    };

    if !args.files.is_empty() {
        raw.monitor.files = args.files.clone();
    }
    if let Some(ms) = args.coalesce_ms {
        raw.monitor.coalesce_ms = ms;
    }

    let cfg = ConfigFile::try_from(raw)?;
    Ok((cfg.files(), cfg.options()))
}

/// One stdout line per content notification.
fn describe(event: &MonitorEvent, print_body: bool) -> Option<String> {
    let MonitorEvent::FileChanged { path, body } = event else {
        return None;
    };
    let line = match body {
        Some(body) if print_body => format!(
            "changed {} ({} bytes)\n{}",
            path.display(),
            body.len(),
            String::from_utf8_lossy(body)
        ),
        Some(body) => format!("changed {} ({} bytes)", path.display(), body.len()),
        None => format!("removed {}", path.display()),
    };
    Some(line)
}
