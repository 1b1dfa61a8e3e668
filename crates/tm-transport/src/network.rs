use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;

use crossbeam_channel::{Receiver, Sender, bounded};
use mio::net::{TcpListener, TcpStream, UdpSocket};
use mio::{Events, Interest, Poll, Token};
use tm_model::DriverState;
use tracing::{info, warn};

use crate::config::NetworkConfig;
use crate::driver::Transport;
use crate::error::TransportError;
use crate::events::TransportEvent;

const CLIENT_TOKEN: Token = Token(0);
const LISTENER_TOKEN: Token = Token(1);
const READ_CHUNK: usize = 16 * 1024;

enum Command {
    Write(Vec<u8>),
    Stop,
}

/// `mio`-driven Network variant: raw bytes out instead of a length-prefixed
/// wire frame, since framing is the frame reader's job, not the
/// transport's.
pub struct NetworkTransport {
    config: NetworkConfig,
    state: DriverState,
    cmd_tx: Option<Sender<Command>>,
    thread: Option<std::thread::JoinHandle<()>>,
    events_tx: Sender<TransportEvent>,
    events_rx: Receiver<TransportEvent>,
}

impl NetworkTransport {
    pub fn new(config: NetworkConfig) -> Self {
        let (events_tx, events_rx) = bounded(1024);
        Self { config, state: DriverState::Closed, cmd_tx: None, thread: None, events_tx, events_rx }
    }

    fn set_state(&mut self, state: DriverState) {
        self.state = state;
        let _ = self.events_tx.send(TransportEvent::StateChanged(state));
    }
}

impl Transport for NetworkTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.state == DriverState::Open {
            return Ok(());
        }
        self.set_state(DriverState::Opening);

        let (cmd_tx, cmd_rx) = bounded::<Command>(256);
        let tx = self.events_tx.clone();
        let config = self.config.clone();

        let mut poll = Poll::new().map_err(TransportError::Io)?;

        let handle = std::thread::spawn(move || {
            if let Err(e) = run_network_loop(&mut poll, config, cmd_rx, &tx) {
                let _ = tx.send(TransportEvent::ErrorOccurred(e.to_string()));
                let _ = tx.send(TransportEvent::StateChanged(DriverState::Failing));
            }
        });

        self.cmd_tx = Some(cmd_tx);
        self.thread = Some(handle);
        self.set_state(DriverState::Open);
        info!("network transport open");
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Stop);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.set_state(DriverState::Closed);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let Some(tx) = &self.cmd_tx else {
            return Err(TransportError::NotOpen);
        };
        tx.send(Command::Write(bytes.to_vec())).map_err(|_| TransportError::NotOpen)?;
        Ok(bytes.len())
    }

    fn is_readable(&self) -> bool {
        self.state == DriverState::Open
    }

    fn is_writable(&self) -> bool {
        self.state == DriverState::Open
    }

    fn configuration_ok(&self) -> bool {
        true
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.events_rx
    }
}

enum Medium {
    TcpClient(TcpStream),
    TcpServer { listener: TcpListener, active: Option<TcpStream> },
    Udp(UdpSocket),
}

fn run_network_loop(
    poll: &mut Poll,
    config: NetworkConfig,
    cmd_rx: Receiver<Command>,
    tx: &Sender<TransportEvent>,
) -> std::io::Result<()> {
    let mut medium = match config {
        NetworkConfig::TcpClient { addr } => {
            let mut stream = connect_nonblocking(addr)?;
            poll.registry().register(&mut stream, CLIENT_TOKEN, Interest::READABLE | Interest::WRITABLE)?;
            Medium::TcpClient(stream)
        }
        NetworkConfig::TcpServer { bind_addr } => {
            let mut listener = TcpListener::bind(bind_addr)?;
            poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
            Medium::TcpServer { listener, active: None }
        }
        NetworkConfig::Udp { bind_addr, multicast_group } => {
            let mut socket = UdpSocket::bind(bind_addr)?;
            if let Some(group) = multicast_group {
                let SocketAddr::V4(v4) = bind_addr else {
                    return Err(std::io::Error::other("multicast requires an IPv4 bind address"));
                };
                socket.join_multicast_v4(&group, v4.ip())?;
            }
            poll.registry().register(&mut socket, CLIENT_TOKEN, Interest::READABLE)?;
            Medium::Udp(socket)
        }
    };

    let mut events = Events::with_capacity(128);
    let mut buf = [0u8; READ_CHUNK];

    loop {
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                Command::Stop => return Ok(()),
                Command::Write(bytes) => write_to_medium(&mut medium, &bytes, tx),
            }
        }

        poll.poll(&mut events, Some(std::time::Duration::from_millis(50)))?;

        for event in events.iter() {
            match &mut medium {
                Medium::TcpClient(stream) => {
                    if event.token() == CLIENT_TOKEN && event.is_readable() {
                        read_tcp_loop(stream, &mut buf, tx);
                    }
                }
                Medium::TcpServer { listener, active } => {
                    if event.token() == LISTENER_TOKEN {
                        while let Ok((mut conn, peer)) = listener.accept() {
                            info!(%peer, "accepted client");
                            let _ = poll.registry().register(
                                &mut conn,
                                CLIENT_TOKEN,
                                Interest::READABLE | Interest::WRITABLE,
                            );
                            if let Some(mut old) = active.replace(conn) {
                                let _ = poll.registry().deregister(&mut old);
                            }
                        }
                    } else if event.token() == CLIENT_TOKEN && event.is_readable() {
                        if let Some(stream) = active {
                            read_tcp_loop(stream, &mut buf, tx);
                        }
                    }
                }
                Medium::Udp(socket) => {
                    if event.token() == CLIENT_TOKEN && event.is_readable() {
                        loop {
                            match socket.recv(&mut buf) {
                                Ok(n) => {
                                    let _ = tx.send(TransportEvent::DataReceived(buf[..n].to_vec()));
                                }
                                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                                Err(e) => {
                                    let _ = tx.send(TransportEvent::ErrorOccurred(e.to_string()));
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn connect_nonblocking(addr: SocketAddr) -> std::io::Result<TcpStream> {
    TcpStream::connect(addr)
}

fn read_tcp_loop(stream: &mut TcpStream, buf: &mut [u8], tx: &Sender<TransportEvent>) {
    loop {
        match stream.read(buf) {
            Ok(0) => {
                let _ = tx.send(TransportEvent::StateChanged(DriverState::Closed));
                break;
            }
            Ok(n) => {
                let _ = tx.send(TransportEvent::DataReceived(buf[..n].to_vec()));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => {
                let _ = tx.send(TransportEvent::ErrorOccurred(e.to_string()));
                let _ = tx.send(TransportEvent::StateChanged(DriverState::Failing));
                break;
            }
        }
    }
}

fn write_to_medium(medium: &mut Medium, bytes: &[u8], tx: &Sender<TransportEvent>) {
    let result = match medium {
        Medium::TcpClient(stream) => stream.write_all(bytes),
        Medium::TcpServer { active: Some(stream), .. } => stream.write_all(bytes),
        Medium::TcpServer { active: None, .. } => return,
        Medium::Udp(_) => {
            warn!("udp write requires a peer address, ignoring");
            return;
        }
    };
    if let Err(e) = result {
        warn!(error = %e, "network write failed");
        let _ = tx.send(TransportEvent::ErrorOccurred(e.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener as StdTcpListener;

    use super::*;

    #[test]
    fn tcp_server_receives_client_bytes() {
        let std_listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let bind_addr = std_listener.local_addr().unwrap();
        drop(std_listener);

        let mut server = NetworkTransport::new(NetworkConfig::TcpServer { bind_addr });
        server.open().unwrap();

        // Give the event loop a moment to bind before a client connects.
        std::thread::sleep(std::time::Duration::from_millis(100));
        let mut client = std::net::TcpStream::connect(bind_addr).unwrap();
        client.write_all(b"hello\n").unwrap();

        let mut got_data = false;
        for _ in 0..20 {
            if let Ok(TransportEvent::DataReceived(bytes)) =
                server.events().recv_timeout(std::time::Duration::from_millis(200))
            {
                assert_eq!(bytes, b"hello\n");
                got_data = true;
                break;
            }
        }
        assert!(got_data, "expected server to observe client bytes");
        server.close().unwrap();
    }
}
