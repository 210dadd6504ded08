use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Sends tracing output to a file; the terminal belongs to the UI.
pub fn init(config: &LogConfig) -> Result<PathBuf> {
    let path = match &config.file {
        Some(path) => path.clone(),
        None => default_log_path()?,
    };
    if let Some(parent) = path.parent() { fs::create_dir_all(parent)?; }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Opening log file {:?}", &path))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level {:?}", config.level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Installing log subscriber: {e}"))?;
    Ok(path)
}

fn default_log_path() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("Could not determine data directory")?;
    Ok(base.join("toastr").join("toastr.log"))
}
