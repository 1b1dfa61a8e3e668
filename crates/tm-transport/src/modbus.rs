use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use rand::Rng;
use tm_model::DriverState;
use tm_timing::{Duration, Repeater};
use tracing::info;

use crate::config::ModbusConfig;
use crate::driver::Transport;
use crate::error::TransportError;
use crate::events::TransportEvent;

/// Synthetic transport: not a real protocol client. Per the "Modbus as
/// synthetic transport" design note, it polls on a fixed interval and
/// synthesizes a comma-joined, `"\n"`-terminated byte sequence so that
/// `NoDelimiters`-free QuickPlot framing can consume it unchanged. A real
/// field-bus client is an external collaborator's concern.
pub struct ModbusTransport {
    config: ModbusConfig,
    state: DriverState,
    stop_flag: Option<Arc<AtomicBool>>,
    thread: Option<std::thread::JoinHandle<()>>,
    events_tx: Sender<TransportEvent>,
    events_rx: Receiver<TransportEvent>,
}

impl ModbusTransport {
    pub fn new(config: ModbusConfig) -> Self {
        let (events_tx, events_rx) = bounded(256);
        Self { config, state: DriverState::Closed, stop_flag: None, thread: None, events_tx, events_rx }
    }

    fn set_state(&mut self, state: DriverState) {
        self.state = state;
        let _ = self.events_tx.send(TransportEvent::StateChanged(state));
    }
}

impl Transport for ModbusTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.state == DriverState::Open {
            return Ok(());
        }
        self.set_state(DriverState::Opening);

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop = stop_flag.clone();
        let tx = self.events_tx.clone();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let register_count = self.config.register_count;

        let handle = std::thread::spawn(move || {
            let mut repeater = Repeater::every(poll_interval);
            let mut rng = rand::rng();
            loop {
                if thread_stop.load(Ordering::Relaxed) {
                    break;
                }
                if repeater.fired() {
                    let row: Vec<String> =
                        (0..register_count).map(|_| rng.random_range(0..=65535).to_string()).collect();
                    let mut line = row.join(",");
                    line.push('\n');
                    let _ = tx.send(TransportEvent::DataReceived(line.into_bytes()));
                }
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        });

        self.stop_flag = Some(stop_flag);
        self.thread = Some(handle);
        self.set_state(DriverState::Open);
        info!(interval_ms = self.config.poll_interval_ms, "modbus synthetic transport open");
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
        Ok(0)
    }

    fn is_readable(&self) -> bool {
        self.state == DriverState::Open
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn configuration_ok(&self) -> bool {
        self.config.poll_interval_ms > 0 && self.config.register_count > 0
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.events_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_comma_joined_lines() {
        let mut t = ModbusTransport::new(ModbusConfig { poll_interval_ms: 5, register_count: 3 });
        assert!(t.configuration_ok());
        t.open().unwrap();
        let evt = t.events().recv_timeout(std::time::Duration::from_millis(500)).unwrap();
        assert!(matches!(evt, TransportEvent::StateChanged(DriverState::Opening)));
        let mut saw_data = false;
        for _ in 0..10 {
            if let Ok(TransportEvent::DataReceived(bytes)) =
                t.events().recv_timeout(std::time::Duration::from_millis(200))
            {
                let line = String::from_utf8(bytes).unwrap();
                assert!(line.ends_with('\n'));
                assert_eq!(line.trim_end().split(',').count(), 3);
                saw_data = true;
                break;
            }
        }
        assert!(saw_data, "expected at least one synthesized reading");
        t.close().unwrap();
    }
}
