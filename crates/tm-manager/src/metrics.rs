use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tm_timing::Nanos;

const ERROR_RING_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Transport,
    Frame,
    Decode,
    Backpressure,
    Fatal,
}

#[derive(Clone, Debug)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub at: Nanos,
    pub message: String,
}

/// Plain `AtomicU64` counters shared between the framer, ingest, and manager
/// threads, same "cheap lock-light shared counter" idiom as `InnerQueue`'s
/// `count`. The error stream itself is a small bounded ring behind a mutex:
/// off the hot path, read only by the manager's owner.
#[derive(Default)]
pub struct Metrics {
    pub frames_emitted: AtomicU64,
    pub checksum_failures: AtomicU64,
    pub oversize_frame_drops: AtomicU64,
    pub oversize_buffer_drops: AtomicU64,
    pub backpressure_events: AtomicU64,
    pub channel_count_mismatches: AtomicU64,
    pub field_parse_errors: AtomicU64,
    pub reconnect_attempts: AtomicU64,
    errors: Mutex<VecDeque<ErrorEvent>>,
}

impl Metrics {
    pub fn record_error(&self, kind: ErrorKind, message: impl Into<String>) {
        let mut errors = self.errors.lock().expect("metrics error ring poisoned");
        if errors.len() >= ERROR_RING_CAPACITY {
            errors.pop_front();
        }
        errors.push_back(ErrorEvent { kind, at: Nanos::now_monotonic(), message: message.into() });
    }

    /// Most recent events first.
    pub fn recent_errors(&self) -> Vec<ErrorEvent> {
        let errors = self.errors.lock().expect("metrics error ring poisoned");
        errors.iter().rev().cloned().collect()
    }

    pub fn relaxed(v: &AtomicU64) -> u64 {
        v.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let metrics = Metrics::default();
        for i in 0..(ERROR_RING_CAPACITY + 10) {
            metrics.record_error(ErrorKind::Transport, format!("err-{i}"));
        }
        let recent = metrics.recent_errors();
        assert_eq!(recent.len(), ERROR_RING_CAPACITY);
        assert_eq!(recent[0].message, format!("err-{}", ERROR_RING_CAPACITY + 9));
    }

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::default();
        assert_eq!(Metrics::relaxed(&metrics.frames_emitted), 0);
    }
}
