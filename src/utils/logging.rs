use crate::utils::app_paths::AppPaths;
use chrono::Local;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of a fresh log file, e.g. `textproc_20240501_093000.log`
pub fn log_file_name() -> String {
    format!("textproc_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Route tracing output to a timestamped file so the terminal only shows
/// progress and notifications. Returns the log path, or `None` when no log
/// directory could be created (logging then stays off).
pub fn init_tracing() -> Option<PathBuf> {
    let log_dir = AppPaths::log_dir().ok()?;
    init_tracing_in(&log_dir)
}

pub fn init_tracing_in(log_dir: &Path) -> Option<PathBuf> {
    let log_path = log_dir.join(log_file_name());
    let file = File::create(&log_path).ok()?;

    #[cfg(unix)]
    {
        let latest = log_dir.join("latest.log");
        let _ = std::fs::remove_file(&latest);
        let _ = std::os::unix::fs::symlink(&log_path, &latest);
    }

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_timer(LocalTime::rfc_3339())
        .with_target(true)
        .with_ansi(false)
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .ok()?;

    tracing::info!(target: "system", "Logging to {}", log_path.display());
    Some(log_path)
}
