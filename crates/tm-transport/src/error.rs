use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport already open with a different configuration")]
    AlreadyOpenWithDifferentConfig,
    #[error("transport is not open")]
    NotOpen,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}
