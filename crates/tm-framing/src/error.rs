use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("frame exceeded max buffer size, oldest bytes dropped")]
    OversizeBuffer,
    #[error("frame exceeded max queue slot size ({0} bytes), dropped")]
    OversizeFrame(usize),
    #[error("frame queue full, reader blocked")]
    Backpressure,
}
