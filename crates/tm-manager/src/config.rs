use std::path::PathBuf;

use tm_model::{FramingConfig, OperatingMode, ProjectDescriptor};
use tm_queue::DEFAULT_CAPACITY;
use tm_transport::TransportConfig;

/// Everything `connect()` needs, gathered up front so `setBusType`/
/// `configure` can mutate one struct in place while `Disconnected`.
#[derive(Clone)]
pub struct ManagerConfig {
    pub bus: TransportConfig,
    pub framing: FramingConfig,
    pub mode: OperatingMode,
    pub project: Option<ProjectDescriptor>,
    pub queue_capacity: usize,
    pub csv_dir: Option<PathBuf>,
    pub plugin_socket: Option<PathBuf>,
    pub reconnect_attempt_limit: Option<u64>,
}

impl ManagerConfig {
    pub fn new(bus: TransportConfig, framing: FramingConfig, mode: OperatingMode) -> Self {
        Self {
            bus,
            framing,
            mode,
            project: None,
            queue_capacity: DEFAULT_CAPACITY,
            csv_dir: None,
            plugin_socket: None,
            reconnect_attempt_limit: None,
        }
    }

    pub fn with_project(mut self, project: ProjectDescriptor) -> Self {
        self.project = Some(project);
        self
    }
}
