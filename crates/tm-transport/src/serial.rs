use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use crossbeam_channel::{Receiver, Sender, bounded};
use serialport::{DataBits as SpDataBits, FlowControl as SpFlowControl, Parity as SpParity, StopBits as SpStopBits};
use tm_model::DriverState;
use tracing::{info, warn};

use crate::config::{DataBits, FlowControl, Parity, SerialConfig, StopBits};
use crate::driver::Transport;
use crate::error::TransportError;
use crate::events::TransportEvent;

/// Read timeout for the blocking acquisition thread. Serial ports aren't
/// mio-pollable on every platform, so this polls with a short timeout
/// instead of integrating with the `Network` variant's event loop.
const READ_TIMEOUT: StdDuration = StdDuration::from_millis(50);
const READ_CHUNK: usize = 4096;

pub struct SerialTransport {
    config: SerialConfig,
    state: DriverState,
    stop_flag: Option<Arc<AtomicBool>>,
    thread: Option<std::thread::JoinHandle<()>>,
    events_tx: Sender<TransportEvent>,
    events_rx: Receiver<TransportEvent>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        let (events_tx, events_rx) = bounded(256);
        Self { config, state: DriverState::Closed, stop_flag: None, thread: None, events_tx, events_rx }
    }

    fn set_state(&mut self, state: DriverState) {
        self.state = state;
        let _ = self.events_tx.send(TransportEvent::StateChanged(state));
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.state == DriverState::Open {
            return Ok(());
        }
        self.set_state(DriverState::Opening);

        let port = serialport::new(&self.config.port_name, self.config.baud_rate)
            .data_bits(match self.config.data_bits {
                DataBits::Seven => SpDataBits::Seven,
                DataBits::Eight => SpDataBits::Eight,
            })
            .parity(match self.config.parity {
                Parity::None => SpParity::None,
                Parity::Odd => SpParity::Odd,
                Parity::Even => SpParity::Even,
            })
            .stop_bits(match self.config.stop_bits {
                StopBits::One => SpStopBits::One,
                StopBits::Two => SpStopBits::Two,
            })
            .flow_control(match self.config.flow_control {
                FlowControl::None => SpFlowControl::None,
                FlowControl::Software => SpFlowControl::Software,
                FlowControl::Hardware => SpFlowControl::Hardware,
            })
            .timeout(READ_TIMEOUT)
            .open();

        let mut port = match port {
            Ok(p) => p,
            Err(e) => {
                self.set_state(DriverState::Failing);
                let _ = self.events_tx.send(TransportEvent::ErrorOccurred(e.to_string()));
                return Err(TransportError::Serial(e));
            }
        };

        let stop_flag = Arc::new(AtomicBool::new(false));
        let tx = self.events_tx.clone();
        let thread_stop = stop_flag.clone();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                if thread_stop.load(Ordering::Relaxed) {
                    break;
                }
                match port.read(&mut buf) {
                    Ok(0) => {}
                    Ok(n) => {
                        let _ = tx.send(TransportEvent::DataReceived(buf[..n].to_vec()));
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        let _ = tx.send(TransportEvent::ErrorOccurred(e.to_string()));
                        let _ = tx.send(TransportEvent::StateChanged(DriverState::Failing));
                        break;
                    }
                }
            }
        });

        self.stop_flag = Some(stop_flag);
        self.thread = Some(handle);
        self.set_state(DriverState::Open);
        info!(port = %self.config.port_name, "serial transport open");
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(flag) = self.stop_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.set_state(DriverState::Closed);
        Ok(())
    }

    fn write(&mut self, _bytes: &[u8]) -> Result<usize, TransportError> {
        // Writes are out of scope for the acquisition thread's ownership of
        // the port handle in this design; a write-capable session would hold
        // a cloned handle. Telemetry ingestion is receive-only in practice.
        if self.state != DriverState::Open {
            return Err(TransportError::NotOpen);
        }
        warn!("serial transport write requested but this driver is receive-only");
        Ok(0)
    }

    fn is_readable(&self) -> bool {
        self.state == DriverState::Open
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn configuration_ok(&self) -> bool {
        !self.config.port_name.is_empty() && self.config.baud_rate > 0
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.events_rx
    }
}
