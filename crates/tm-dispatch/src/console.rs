/// Raw, pre-framing byte sink. Driven directly by the manager so raw bytes
/// reach a console view before C4 has even attempted to extract a frame.
pub trait ConsoleSink: Send {
    fn on_bytes(&mut self, bytes: &[u8], is_paused: bool);
}

/// Writes straight to stdout when not paused; the bundled default, since a
/// real terminal UI is an external collaborator's concern.
#[derive(Default)]
pub struct StdoutConsoleSink;

impl ConsoleSink for StdoutConsoleSink {
    fn on_bytes(&mut self, bytes: &[u8], is_paused: bool) {
        if is_paused {
            return;
        }
        use std::io::Write;
        let _ = std::io::stdout().write_all(bytes);
    }
}
