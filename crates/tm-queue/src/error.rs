use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EmptyError {
    #[error("queue is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueFullError {
    #[error("queue is at capacity")]
    Full,
}
