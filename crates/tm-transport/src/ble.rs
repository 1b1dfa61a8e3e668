use crossbeam_channel::{Receiver, bounded};
use tm_model::DriverState;

use crate::config::BleConfig;
use crate::driver::Transport;
use crate::error::TransportError;
use crate::events::TransportEvent;

/// Thin placeholder for a BLE notify/write driver. A real product delegates
/// the GATT stack to an external collaborator (e.g. `btleplug`); this crate
/// only needs the narrow `Transport` boundary to exist so the workspace
/// builds without a system BLE stack present.
pub struct BleTransport {
    config: BleConfig,
    state: DriverState,
    events_rx: Receiver<TransportEvent>,
}

impl BleTransport {
    pub fn new(config: BleConfig) -> Self {
        let (_tx, events_rx) = bounded(1);
        Self { config, state: DriverState::Closed, events_rx }
    }
}

impl Transport for BleTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        Err(TransportError::InvalidConfig(format!(
            "BLE transport for service {} is not wired to a GATT backend in this build",
            self.config.service_uuid
        )))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state = DriverState::Closed;
        Ok(())
    }

    fn write(&mut self, _bytes: &[u8]) -> Result<usize, TransportError> {
        Err(TransportError::NotOpen)
    }

    fn is_readable(&self) -> bool {
        false
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn configuration_ok(&self) -> bool {
        !self.config.service_uuid.is_empty() && !self.config.characteristic_uuid.is_empty()
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.events_rx
    }
}
