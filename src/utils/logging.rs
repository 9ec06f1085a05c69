use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Cross-platform log directory
fn get_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("trials-cli")
        .join("logs")
}

/// Set up tracing with a timestamped log file. The TUI owns the terminal,
/// so nothing is ever logged to stdout; callers announce the returned path
/// before entering the alternate screen.
///
/// Filtering follows RUST_LOG, defaulting to `info`.
pub fn init_tracing() -> Result<PathBuf> {
    let log_dir = get_log_dir();
    fs::create_dir_all(&log_dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("trials-cli_{}.log", timestamp));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Keep a "latest.log" pointer for easy tailing
    #[cfg(unix)]
    {
        let latest_path = log_dir.join("latest.log");
        let _ = fs::remove_file(&latest_path);
        let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    tracing::info!(target: "system", "Logging initialized");

    Ok(log_path)
}
