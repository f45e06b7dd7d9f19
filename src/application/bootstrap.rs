use crate::infrastructure::config::{
    ensure_default_config, load_api_config_from_lookup, load_app_config, AppConfig,
};
use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    bootstrap_workspace_with_lookup(workspace_root, |key| std::env::var(key).ok())
}

/// Creates `config/` and `logs/`, writes the default `app.json` when it is
/// missing, then loads it with environment overrides applied.
pub fn bootstrap_workspace_with_lookup<F>(
    workspace_root: &Path,
    lookup: F,
) -> Result<BootstrapResult, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_dir = workspace_root.join("config");
    let logs_dir = workspace_root.join("logs");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_config(&config_dir)?;
    let config = load_api_config_from_lookup(load_app_config(&config_dir)?, lookup)?;
    info!(
        root = %workspace_root.display(),
        api_base_url = %config.api_base_url,
        timezone = %config.timezone,
        "workspace ready"
    );

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        config,
    })
}
