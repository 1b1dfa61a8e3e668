use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;
use tm_checksum::Checksum;
use tm_model::FramingConfig;
use tm_queue::QueueProducer;
use tm_utils::{ThreadPriority, thread_boot};
use tracing::{Level, info, span, warn};

use crate::error::FrameError;
use crate::extractor::{ExtractStep, FrameExtractor};
use crate::ring_buffer::DEFAULT_MAX_BUFFER_BYTES;
use crate::slot::slot_from_bytes;

pub struct FrameReaderConfig {
    pub core: Option<usize>,
    pub priority: ThreadPriority,
    pub max_buffer_bytes: usize,
}

impl Default for FrameReaderConfig {
    fn default() -> Self {
        Self { core: None, priority: ThreadPriority::OSDefault, max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES }
    }
}

/// Boots the frame reader thread: pulls raw byte chunks off `bytes_in`,
/// extracts frames per `framing`, and pushes validated frames into
/// `out_queue`. Runs until `stop_flag` is observed set, then drains the
/// buffer to the last complete frame before returning.
///
/// Lifecycle mirrors `attach_tile`: affinity/priority set up once, a span
/// scoping every log line to this thread, and the stop flag checked between
/// frame-extraction attempts rather than mid-extraction.
pub fn spawn_frame_reader(
    framing: FramingConfig,
    checksum: &'static dyn Checksum,
    bytes_in: Receiver<Vec<u8>>,
    out_queue: QueueProducer<crate::slot::RawFrameSlot>,
    stop_flag: Arc<AtomicBool>,
    config: FrameReaderConfig,
) -> std::thread::JoinHandle<FrameReaderStats> {
    std::thread::spawn(move || {
        let _span = span!(Level::INFO, "frame-reader").entered();
        thread_boot(config.core, config.priority);

        let mut extractor = FrameExtractor::new(framing, checksum, config.max_buffer_bytes);
        let mut stats = FrameReaderStats::default();

        info!("frame reader init complete");

        loop {
            match bytes_in.recv_timeout(std::time::Duration::from_millis(50)) {
                Ok(chunk) => {
                    extractor.append(&chunk);
                    drain_into_queue(&mut extractor, &out_queue, &mut stats);
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }

            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
        }

        // Drain whatever is left (only full frames already in the buffer
        // surface; an unterminated tail frame is discarded per the
        // "terminal frame on close is not emitted" rule).
        drain_into_queue(&mut extractor, &out_queue, &mut stats);
        stats.oversize_buffer_drops = extractor.oversize_drops();
        info!(?stats, "frame reader teardown complete");
        stats
    })
}

fn drain_into_queue(
    extractor: &mut FrameExtractor,
    out_queue: &QueueProducer<crate::slot::RawFrameSlot>,
    stats: &mut FrameReaderStats,
) {
    for step in extractor.drain_ready() {
        match step {
            ExtractStep::Emitted(payload) => {
                let Some(slot) = slot_from_bytes(&payload) else {
                    stats.record(FrameError::OversizeFrame(payload.len()));
                    continue;
                };
                let mut retries = 0u32;
                while out_queue.try_enqueue(&slot).is_err() {
                    stats.record(FrameError::Backpressure);
                    std::hint::spin_loop();
                    retries += 1;
                    if retries % 10_000 == 0 {
                        warn!(retries, "frame reader blocked on full queue");
                    }
                }
                stats.frames_emitted += 1;
            }
            ExtractStep::ChecksumMismatch => {
                stats.record(FrameError::ChecksumMismatch);
            }
            ExtractStep::NotEnoughData => unreachable!("drain_ready stops before this"),
        }
    }
}

#[derive(Debug, Default)]
pub struct FrameReaderStats {
    pub frames_emitted: u64,
    pub checksum_failures: u64,
    pub oversize_frame_drops: u64,
    pub oversize_buffer_drops: u64,
    pub backpressure_events: u64,
}

impl FrameReaderStats {
    fn record(&mut self, err: FrameError) {
        match err {
            FrameError::ChecksumMismatch => self.checksum_failures += 1,
            FrameError::OversizeFrame(_) => self.oversize_frame_drops += 1,
            FrameError::OversizeBuffer => self.oversize_buffer_drops += 1,
            FrameError::Backpressure => self.backpressure_events += 1,
        }
    }
}
