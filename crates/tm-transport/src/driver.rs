use crossbeam_channel::Receiver;
use tm_model::DriverState;

use crate::error::TransportError;

/// Uniform contract every transport variant implements, regardless of
/// physical medium.
pub trait Transport: Send {
    /// Idempotent if already `Open` with an identical configuration;
    /// otherwise the caller must `close()` first.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Releases resources. Must succeed from any state, including `Failing`.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the number of bytes accepted. Non-blocking where the medium
    /// allows it.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    fn is_readable(&self) -> bool;
    fn is_writable(&self) -> bool;
    fn configuration_ok(&self) -> bool;
    fn state(&self) -> DriverState;

    /// Channel of push events: `DataReceived`, `StateChanged`,
    /// `ErrorOccurred`. The caller polls this, typically from the manager's
    /// own loop or a bridging thread that forwards into the frame reader.
    fn events(&self) -> &Receiver<crate::events::TransportEvent>;
}
