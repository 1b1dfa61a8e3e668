mod ble;
mod config;
mod driver;
mod error;
mod events;
mod modbus;
mod network;
mod serial;

pub use config::{
    BleConfig, DataBits, FlowControl, ModbusConfig, NetworkConfig, Parity, SerialConfig, StopBits,
    TransportConfig,
};
pub use driver::Transport;
pub use error::TransportError;
pub use events::TransportEvent;

use ble::BleTransport;
use modbus::ModbusTransport;
use network::NetworkTransport;
use serial::SerialTransport;

/// Builds the concrete driver for a configuration, boxed behind the
/// `Transport` capability interface. Selection is by enum, replacing the
/// inheritance hierarchy the source used for driver variants.
pub fn build_transport(config: TransportConfig) -> Box<dyn Transport> {
    match config {
        TransportConfig::Serial(c) => Box::new(SerialTransport::new(c)),
        TransportConfig::Network(c) => Box::new(NetworkTransport::new(c)),
        TransportConfig::ModbusRtu(c) | TransportConfig::ModbusTcp(c) => Box::new(ModbusTransport::new(c)),
        TransportConfig::BluetoothLe(c) => Box::new(BleTransport::new(c)),
    }
}
