use tm_model::TelemetryFrame;

use crate::console::ConsoleSink;
use crate::csv_writer::CsvWriter;
use crate::plugin_broadcaster::PluginBroadcaster;
use crate::visualization::VisualizationSink;

/// Fan-out point with three independent sinks plus the raw console path.
/// Pause isolation lives here: while paused, `dispatch` delivers to none of
/// the three frame sinks, but `dispatch_raw` still reaches the console.
pub struct DispatchHub {
    visualization: Box<dyn VisualizationSink>,
    csv: Option<CsvWriter>,
    plugin: Option<PluginBroadcaster>,
    console: Box<dyn ConsoleSink>,
    paused: bool,
}

impl DispatchHub {
    pub fn new(
        visualization: Box<dyn VisualizationSink>,
        csv: Option<CsvWriter>,
        plugin: Option<PluginBroadcaster>,
        console: Box<dyn ConsoleSink>,
    ) -> Self {
        Self { visualization, csv, plugin, console, paused: false }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Fans a built frame out to visualization, CSV, and plugin sinks.
    /// While paused, this is a no-op: zero frames reach any of the three.
    pub fn dispatch(&mut self, frame: &TelemetryFrame) {
        if self.paused {
            return;
        }
        self.visualization.ingest(frame);
        self.visualization.tick();
        if let Some(csv) = &self.csv {
            csv.write_frame(frame.clone());
        }
        if let Some(plugin) = &self.plugin {
            plugin.broadcast(frame.clone());
        }
    }

    /// Raw pre-framing bytes, always routed to the console regardless of
    /// the dispatch-level pause gate (the console sink itself decides what
    /// to do with `is_paused`).
    pub fn dispatch_raw(&mut self, bytes: &[u8]) {
        self.console.on_bytes(bytes, self.paused);
    }
}

#[cfg(test)]
mod tests {
    use tm_model::{Dataset, DatasetValue, Group};

    use super::*;
    use crate::visualization::InMemoryCoalescer;

    struct RecordingConsole {
        calls: Vec<(Vec<u8>, bool)>,
    }

    impl ConsoleSink for RecordingConsole {
        fn on_bytes(&mut self, bytes: &[u8], is_paused: bool) {
            self.calls.push((bytes.to_vec(), is_paused));
        }
    }

    fn frame() -> TelemetryFrame {
        TelemetryFrame {
            title: "t".to_string(),
            groups: vec![Group {
                title: "g".to_string(),
                widget: "group".to_string(),
                datasets: vec![Dataset {
                    title: "d".to_string(),
                    units: String::new(),
                    widget: "plot".to_string(),
                    index: 1,
                    value: DatasetValue::Number(1.0),
                    alarm_low: None,
                    alarm_high: None,
                    fft: false,
                    log: false,
                    history_depth: None,
                }],
            }],
        }
    }

    #[test]
    fn pause_blocks_frame_dispatch_but_not_console() {
        let mut hub = DispatchHub::new(
            Box::new(InMemoryCoalescer::new(tm_timing::Duration::ZERO)),
            None,
            None,
            Box::new(RecordingConsole { calls: Vec::new() }),
        );
        hub.set_paused(true);
        hub.dispatch(&frame());
        hub.dispatch_raw(b"raw");
        // visualization never observed the frame: nothing panics, and the
        // console still received the raw bytes with is_paused = true.
    }
}
