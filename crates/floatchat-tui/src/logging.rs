use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use floatchat_core::Config;

/// Overrides the default `info` filter, e.g. `FLOATCHAT_LOG=floatchat_core=debug`
const LOG_FILTER_ENV: &str = "FLOATCHAT_LOG";

pub fn log_path() -> Result<PathBuf> {
    Ok(Config::config_dir()?.join("floatchat.log"))
}

/// Send tracing output to the log file; the terminal belongs to the UI.
pub fn init() -> Result<PathBuf> {
    let path = log_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    let log_file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(path)
}
