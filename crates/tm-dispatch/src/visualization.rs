use std::collections::HashMap;

use tm_model::{DatasetValue, TelemetryFrame};
use tm_timing::{Duration, Repeater};

/// Boundary the core calls into for rendering; the bundled implementation
/// is an in-memory last-write-wins coalescer. Real rendering is an external
/// collaborator's concern, per the visualization aggregator's role.
pub trait VisualizationSink: Send {
    fn ingest(&mut self, frame: &TelemetryFrame);

    /// Called on every dispatch tick; implementations that coalesce should
    /// only act when their internal `Repeater` fires.
    fn tick(&mut self);
}

/// Default ~20 Hz coalescing boundary. Ingress above the coalescing rate
/// only keeps the latest value per `(group, dataset)`; nothing downstream
/// ever observes more than one update per interval for any given dataset.
pub struct InMemoryCoalescer {
    pending: HashMap<(String, String), DatasetValue>,
    flushed: HashMap<(String, String), DatasetValue>,
    repeater: Repeater,
}

impl InMemoryCoalescer {
    pub const DEFAULT_COALESCE_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(coalesce_interval: Duration) -> Self {
        Self { pending: HashMap::new(), flushed: HashMap::new(), repeater: Repeater::every(coalesce_interval) }
    }

    /// Snapshot as of the last flush; what a renderer would observe.
    pub fn snapshot(&self) -> &HashMap<(String, String), DatasetValue> {
        &self.flushed
    }
}

impl Default for InMemoryCoalescer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COALESCE_INTERVAL)
    }
}

impl VisualizationSink for InMemoryCoalescer {
    fn ingest(&mut self, frame: &TelemetryFrame) {
        for group in &frame.groups {
            for dataset in &group.datasets {
                self.pending.insert((group.title.clone(), dataset.title.clone()), dataset.value.clone());
            }
        }
    }

    fn tick(&mut self) {
        if self.repeater.fired() {
            for (key, value) in self.pending.drain() {
                self.flushed.insert(key, value);
            }
        }
    }
}
