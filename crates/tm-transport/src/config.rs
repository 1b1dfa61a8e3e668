use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Seven,
    Eight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkConfig {
    TcpClient { addr: SocketAddr },
    TcpServer { bind_addr: SocketAddr },
    Udp { bind_addr: SocketAddr, multicast_group: Option<std::net::Ipv4Addr> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    pub poll_interval_ms: u64,
    pub register_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BleConfig {
    pub service_uuid: String,
    pub characteristic_uuid: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransportConfig {
    Serial(SerialConfig),
    Network(NetworkConfig),
    ModbusRtu(ModbusConfig),
    ModbusTcp(ModbusConfig),
    BluetoothLe(BleConfig),
}
