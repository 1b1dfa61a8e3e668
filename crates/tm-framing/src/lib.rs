mod error;
mod extractor;
mod reader;
mod ring_buffer;
mod slot;

pub use error::FrameError;
pub use extractor::{ExtractStep, FrameExtractor};
pub use reader::{FrameReaderConfig, FrameReaderStats, spawn_frame_reader};
pub use ring_buffer::{DEFAULT_MAX_BUFFER_BYTES, RingBuffer};
pub use slot::{MAX_FRAME_BYTES, RawFrameSlot, slot_from_bytes};
