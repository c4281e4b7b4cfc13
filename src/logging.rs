//! File-backed `tracing` subscriber. The terminal belongs to the UI, so
//! nothing is ever written to stdout or stderr from here.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub fn log_path() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("could not resolve data directory")?;
    Ok(base.join("dirpilot").join("dirpilot.log"))
}

/// Filter from `RUST_LOG` when set, the configured level otherwise.
fn env_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing(config: &AppConfig) -> Result<PathBuf> {
    let path = log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing::info!(log = %path.display(), "logging initialised");
    Ok(path)
}
