use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] tm_transport::TransportError),
    #[error("decode error: {0}")]
    Decode(#[from] tm_decode::DecodeError),
    #[error("unknown checksum: {0}")]
    UnknownChecksum(#[from] tm_checksum::ChecksumError),
    #[error("operation not valid in state {state:?}")]
    InvalidState { state: tm_model::ManagerState },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
