mod backoff;
mod config;
mod error;
mod manager;
mod metrics;

pub use backoff::ReconnectBackoff;
pub use config::ManagerConfig;
pub use error::ManagerError;
pub use manager::Manager;
pub use metrics::{ErrorEvent, ErrorKind, Metrics};
