mod error;
mod queue;
mod seqlock;

pub use error::{EmptyError, QueueFullError};
pub use queue::{DEFAULT_CAPACITY, FrameQueue, QueueConsumer, QueueProducer};
pub use seqlock::Seqlock;
