use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tm_manager::ManagerConfig;
use tm_model::{FramingConfig, OperatingMode, ProjectDescriptor};
use tm_transport::TransportConfig;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("couldn't read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("malformed config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("couldn't read project file {path}: {source}")]
    ReadProject { path: PathBuf, source: std::io::Error },
    #[error("malformed project file {path}: {source}")]
    ParseProject { path: PathBuf, source: serde_json::Error },
}

/// Recommended process exit codes, per the runtime configuration surface.
pub mod exit_code {
    pub const NORMAL: i32 = 0;
    pub const CONFIG_ERROR: i32 = 2;
    pub const TRANSPORT_OPEN_FAILURE: i32 = 3;
    pub const PROJECT_LOAD_FAILURE: i32 = 4;
}

/// On-disk shape of a `tm-cli` configuration file: bus type, per-bus
/// config, framing config, operating mode, and an optional path to a
/// project descriptor (loaded separately so a malformed project file can
/// be reported with its own exit code).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CliConfigFile {
    pub bus: TransportConfig,
    pub framing: FramingConfig,
    pub mode: OperatingMode,
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    #[serde(default)]
    pub reconnect_attempt_limit: Option<u64>,
}

pub fn load_config_file(path: &Path) -> Result<CliConfigFile, CliError> {
    let text =
        std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse { path: path.to_path_buf(), source })
}

pub fn load_project(path: &Path) -> Result<ProjectDescriptor, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CliError::ReadProject { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseProject { path: path.to_path_buf(), source })
}

/// Assembles a [`ManagerConfig`] from a loaded config file plus the
/// CLI-provided sink roots (`--dump-csv-dir`/`--plugin-socket`).
pub fn build_manager_config(
    file: CliConfigFile,
    csv_dir: Option<PathBuf>,
    plugin_socket: Option<PathBuf>,
) -> Result<ManagerConfig, CliError> {
    let mut config = ManagerConfig::new(file.bus, file.framing, file.mode);
    config.reconnect_attempt_limit = file.reconnect_attempt_limit;
    config.csv_dir = csv_dir;
    config.plugin_socket = plugin_socket;
    if let Some(project_path) = &file.project_path {
        config.project = Some(load_project(project_path)?);
    }
    Ok(config)
}

pub fn install_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
