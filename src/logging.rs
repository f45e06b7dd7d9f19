use crate::infrastructure::error::InfraError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "moonly.log";

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs a stderr subscriber honouring `RUST_LOG`, falling back to
/// `default_directive`. Returns `Ok(false)` when a subscriber is already set.
pub fn init_logging(default_directive: &str) -> Result<bool, InfraError> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .try_init()
        .is_ok();
    Ok(installed)
}

/// Same as [`init_logging`] but appends plain-text lines to
/// `logs_dir/moonly.log`.
pub fn init_file_logging(logs_dir: &Path, default_directive: &str) -> Result<bool, InfraError> {
    std::fs::create_dir_all(logs_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(LOG_FILE_NAME))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init()
        .is_ok();
    Ok(installed)
}
