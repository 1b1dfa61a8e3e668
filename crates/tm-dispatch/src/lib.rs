mod console;
mod csv_writer;
mod hub;
mod plugin_broadcaster;
mod visualization;

pub use console::{ConsoleSink, StdoutConsoleSink};
pub use csv_writer::CsvWriter;
pub use hub::DispatchHub;
pub use plugin_broadcaster::PluginBroadcaster;
pub use visualization::{InMemoryCoalescer, VisualizationSink};
