use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use crossbeam_channel::{Receiver, Sender, bounded};
use tm_checksum::Checksum;
use tm_decode::FrameBuilder;
use tm_dispatch::{ConsoleSink, CsvWriter, DispatchHub, InMemoryCoalescer, PluginBroadcaster, StdoutConsoleSink};
use tm_framing::{FrameReaderConfig, RawFrameSlot, spawn_frame_reader};
use tm_model::{DriverState, ManagerState, OperatingMode};
use tm_queue::FrameQueue;
use tm_transport::{Transport, TransportConfig, TransportEvent, build_transport};
use tracing::{info, warn};

use crate::backoff::ReconnectBackoff;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::metrics::{ErrorKind, Metrics};

const SUPERVISOR_IDLE_SLEEP: StdDuration = StdDuration::from_millis(1);

struct Session {
    transport: Arc<Mutex<Box<dyn Transport>>>,
    bytes_tx: Sender<Vec<u8>>,
    stop_flag: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    reader_handle: JoinHandle<tm_framing::FrameReaderStats>,
    supervisor_handle: JoinHandle<()>,
}

/// Owns the full session lifecycle: bus selection, transport, the frame
/// reader thread, the frame builder, and the dispatch hub.
pub struct Manager {
    config: ManagerConfig,
    state: ManagerState,
    session: Option<Session>,
    metrics: Arc<Metrics>,
}

impl Manager {
    pub fn new(config: ManagerConfig) -> Self {
        Self { config, state: ManagerState::Disconnected, session: None, metrics: Arc::new(Metrics::default()) }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Only legal while `Disconnected`.
    pub fn set_bus_type(&mut self, bus: TransportConfig) -> Result<(), ManagerError> {
        self.require_disconnected()?;
        self.config.bus = bus;
        Ok(())
    }

    pub fn configure(&mut self, f: impl FnOnce(&mut ManagerConfig)) -> Result<(), ManagerError> {
        self.require_disconnected()?;
        f(&mut self.config);
        Ok(())
    }

    /// Validates config, opens the transport (retrying with exponential
    /// backoff per the reconnect policy until an optional attempt cap is
    /// hit), constructs the frame reader and ingest supervisor, and
    /// transitions to `Connected`.
    pub fn connect(&mut self) -> Result<(), ManagerError> {
        self.require_disconnected()?;

        if self.config.mode == OperatingMode::ProjectFile && self.config.project.is_none() {
            return Err(ManagerError::Config("ProjectFile mode requires a project descriptor".to_string()));
        }
        let checksum: &'static dyn Checksum = tm_checksum::lookup(self.config.framing.checksum_name())?;

        let mut transport = build_transport(self.config.bus.clone());
        if !transport.configuration_ok() {
            return Err(ManagerError::Config("transport configuration rejected by driver".to_string()));
        }

        let mut backoff = ReconnectBackoff::new(self.config.reconnect_attempt_limit);
        loop {
            match transport.open() {
                Ok(()) => {
                    backoff.record_success();
                    break;
                }
                Err(e) => {
                    self.metrics.record_error(ErrorKind::Transport, e.to_string());
                    if backoff.exhausted() {
                        return Err(e.into());
                    }
                    let delay = backoff.record_failure();
                    std::thread::sleep(delay.into());
                }
            }
        }

        let builder = match self.config.mode {
            OperatingMode::ProjectFile => {
                let project = self.config.project.clone().expect("checked above");
                FrameBuilder::for_project_file(project)?
            }
            OperatingMode::QuickPlot => FrameBuilder::for_quick_plot(),
            OperatingMode::DeviceSendsJSON => FrameBuilder::for_device_sends_json(),
        };

        let hub = build_hub(&self.config)?;

        let (producer, consumer) = FrameQueue::<RawFrameSlot>::bounded(self.config.queue_capacity);
        let (bytes_tx, bytes_rx) = bounded::<Vec<u8>>(256);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));

        let reader_handle = spawn_frame_reader(
            self.config.framing.clone(),
            checksum,
            bytes_rx,
            producer,
            Arc::clone(&stop_flag),
            FrameReaderConfig::default(),
        );

        let event_rx = transport.events().clone();
        let transport = Arc::new(Mutex::new(transport));

        let supervisor_handle = spawn_supervisor(
            Arc::clone(&transport),
            event_rx,
            bytes_tx.clone(),
            consumer,
            builder,
            hub,
            Arc::clone(&stop_flag),
            Arc::clone(&paused),
            Arc::clone(&self.metrics),
            ReconnectBackoff::new(self.config.reconnect_attempt_limit),
        );

        self.session =
            Some(Session { transport, bytes_tx, stop_flag, paused, reader_handle, supervisor_handle });
        self.state = ManagerState::Connected;
        info!("manager connected");
        Ok(())
    }

    /// Stops the frame reader and supervisor (each drains its own queue to
    /// the last complete unit of work before exiting), then closes the
    /// transport.
    pub fn disconnect(&mut self) -> Result<(), ManagerError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session.stop_flag.store(true, Ordering::Relaxed);
        let stats = session.reader_handle.join().expect("frame reader thread panicked");
        session.supervisor_handle.join().expect("supervisor thread panicked");
        session.transport.lock().expect("transport mutex poisoned").close()?;
        info!(?stats, "manager disconnected");
        self.state = ManagerState::Disconnected;
        Ok(())
    }

    /// Toggles the "deliver to the dispatch hub" gate; the transport and
    /// frame reader keep running while paused.
    pub fn pause(&mut self) -> Result<(), ManagerError> {
        let session = self.session.as_ref().ok_or(ManagerError::InvalidState { state: self.state })?;
        session.paused.store(true, Ordering::Relaxed);
        self.state = ManagerState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ManagerError> {
        let session = self.session.as_ref().ok_or(ManagerError::InvalidState { state: self.state })?;
        session.paused.store(false, Ordering::Relaxed);
        self.state = ManagerState::Connected;
        Ok(())
    }

    pub fn write(&self, bytes: &[u8]) -> Result<usize, ManagerError> {
        let session = self.session.as_ref().ok_or(ManagerError::InvalidState { state: self.state })?;
        let mut guard = session.transport.lock().expect("transport mutex poisoned");
        Ok(guard.write(bytes)?)
    }

    fn require_disconnected(&self) -> Result<(), ManagerError> {
        if self.state != ManagerState::Disconnected {
            return Err(ManagerError::InvalidState { state: self.state });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tm_model::{FrameDetection, FramingConfig};
    use tm_transport::{NetworkConfig, TransportConfig};

    use super::*;

    fn sample_config() -> ManagerConfig {
        let bus = TransportConfig::Network(NetworkConfig::TcpClient {
            addr: "127.0.0.1:9".parse().unwrap(),
        });
        let framing = FramingConfig::new(FrameDetection::EndDelimiter, "", "\n", "none");
        ManagerConfig::new(bus, framing, OperatingMode::QuickPlot)
    }

    #[test]
    fn pause_before_connect_is_invalid_state() {
        let mut manager = Manager::new(sample_config());
        assert!(matches!(manager.pause(), Err(ManagerError::InvalidState { .. })));
    }

    #[test]
    fn write_before_connect_is_invalid_state() {
        let manager = Manager::new(sample_config());
        assert!(matches!(manager.write(b"x"), Err(ManagerError::InvalidState { .. })));
    }

    #[test]
    fn set_bus_type_allowed_while_disconnected() {
        let mut manager = Manager::new(sample_config());
        let new_bus = TransportConfig::Network(NetworkConfig::TcpClient {
            addr: "127.0.0.1:10".parse().unwrap(),
        });
        assert!(manager.set_bus_type(new_bus).is_ok());
    }

    #[test]
    fn project_file_mode_without_project_fails_validation() {
        let bus = TransportConfig::Network(NetworkConfig::TcpClient {
            addr: "127.0.0.1:9".parse().unwrap(),
        });
        let framing = FramingConfig::new(FrameDetection::EndDelimiter, "", "\n", "none");
        let mut manager = Manager::new(ManagerConfig::new(bus, framing, OperatingMode::ProjectFile));
        assert!(matches!(manager.connect(), Err(ManagerError::Config(_))));
    }
}

fn build_hub(config: &ManagerConfig) -> Result<DispatchHub, ManagerError> {
    let visualization = Box::new(InMemoryCoalescer::default());
    let csv = match &config.csv_dir {
        Some(dir) => Some(CsvWriter::open(dir, &hub_title(config))?),
        None => None,
    };
    let plugin = match &config.plugin_socket {
        Some(path) => Some(open_plugin_broadcaster(path)?),
        None => None,
    };
    let console: Box<dyn ConsoleSink> = Box::new(StdoutConsoleSink);
    Ok(DispatchHub::new(visualization, csv, plugin, console))
}

#[cfg(unix)]
fn open_plugin_broadcaster(path: &std::path::Path) -> std::io::Result<PluginBroadcaster> {
    PluginBroadcaster::listen(path.to_path_buf())
}

#[cfg(not(unix))]
fn open_plugin_broadcaster(path: &std::path::Path) -> std::io::Result<PluginBroadcaster> {
    // On non-Unix targets the "socket path" is interpreted as a loopback
    // port number, per the TCP-loopback fallback documented on the sink.
    let port: u16 = path.to_string_lossy().parse().unwrap_or(0);
    PluginBroadcaster::listen_tcp_loopback(std::net::SocketAddr::from(([127, 0, 0, 1], port)))
}

fn hub_title(config: &ManagerConfig) -> String {
    config.project.as_ref().map(|p| p.title.clone()).unwrap_or_else(|| "session".to_string())
}

#[allow(clippy::too_many_arguments)]
fn spawn_supervisor(
    transport: Arc<Mutex<Box<dyn Transport>>>,
    event_rx: Receiver<TransportEvent>,
    bytes_tx: Sender<Vec<u8>>,
    mut consumer: tm_queue::QueueConsumer<RawFrameSlot>,
    mut builder: FrameBuilder,
    mut hub: DispatchHub,
    stop_flag: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
    mut backoff: ReconnectBackoff,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut failing = false;
        let mut slot = RawFrameSlot::default();

        loop {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            hub.set_paused(paused.load(Ordering::Relaxed));

            let mut did_work = false;
            while let Ok(event) = event_rx.try_recv() {
                did_work = true;
                match event {
                    TransportEvent::DataReceived(bytes) => {
                        hub.dispatch_raw(&bytes);
                        let _ = bytes_tx.send(bytes);
                    }
                    TransportEvent::StateChanged(DriverState::Failing) => {
                        failing = true;
                        metrics.record_error(ErrorKind::Transport, "transport entered Failing state");
                    }
                    TransportEvent::StateChanged(state) => {
                        info!(?state, "transport state changed");
                    }
                    TransportEvent::ErrorOccurred(message) => {
                        metrics.record_error(ErrorKind::Transport, message);
                    }
                }
            }

            if failing && backoff.ready() {
                let mut guard = transport.lock().expect("transport mutex poisoned");
                let reopened = guard.close().and_then(|()| guard.open());
                drop(guard);
                match reopened {
                    Ok(()) => {
                        failing = false;
                        backoff.record_success();
                        metrics.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
                        info!("transport reconnected");
                    }
                    Err(e) => {
                        backoff.record_failure();
                        metrics.record_error(ErrorKind::Transport, e.to_string());
                        warn!(error = %e, "reconnect attempt failed");
                    }
                }
            }

            while consumer.try_dequeue(&mut slot).is_ok() {
                did_work = true;
                match builder.build(slot.as_slice()) {
                    Ok(Some(result)) => {
                        metrics.frames_emitted.fetch_add(1, Ordering::Relaxed);
                        hub.dispatch(&result.frame);
                    }
                    Ok(None) => {
                        metrics.channel_count_mismatches.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        metrics.record_error(ErrorKind::Decode, e.to_string());
                    }
                }
            }

            metrics.field_parse_errors.store(builder.field_parse_errors, Ordering::Relaxed);

            if !did_work {
                std::thread::sleep(SUPERVISOR_IDLE_SLEEP);
            }
        }
    })
}
