use tm_model::DriverState;

/// Pushed events a driver emits for its owner (the manager) to observe.
/// Every variant is push-only; drivers never block waiting for a consumer.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    DataReceived(Vec<u8>),
    StateChanged(DriverState),
    ErrorOccurred(String),
}
