use std::io::Write;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender, bounded};
use mio::{Events, Interest, Poll, Token};
use tm_model::TelemetryFrame;
use tracing::{info, warn};

#[cfg(unix)]
use mio::net::{UnixListener, UnixStream};
#[cfg(not(unix))]
use mio::net::{TcpListener as UnixListener, TcpStream as UnixStream};

const LISTENER_TOKEN: Token = Token(usize::MAX);

enum Command {
    Broadcast(TelemetryFrame),
    Stop,
}

/// Best-effort fan-out of each `TelemetryFrame` as one newline-delimited
/// JSON object to every subscribed client. A client that can't keep up or
/// disconnects is dropped without affecting the others; listens on a local
/// Unix domain socket (or, on non-Unix targets, a TCP loopback listener)
/// with a non-blocking accept/broadcast loop.
pub struct PluginBroadcaster {
    tx: Option<Sender<Command>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl PluginBroadcaster {
    #[cfg(unix)]
    pub fn listen(socket_path: PathBuf) -> std::io::Result<Self> {
        let _ = std::fs::remove_file(&socket_path);
        let listener = UnixListener::bind(socket_path)?;
        Self::spawn(listener)
    }

    #[cfg(not(unix))]
    pub fn listen_tcp_loopback(bind_addr: std::net::SocketAddr) -> std::io::Result<Self> {
        let listener = UnixListener::bind(bind_addr)?;
        Self::spawn(listener)
    }

    fn spawn(mut listener: UnixListener) -> std::io::Result<Self> {
        let mut poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        let (tx, rx) = bounded::<Command>(1024);
        let thread = std::thread::spawn(move || run_broadcaster(poll, listener, rx));
        info!("plugin broadcaster listening");
        Ok(Self { tx: Some(tx), thread: Some(thread) })
    }

    pub fn broadcast(&self, frame: TelemetryFrame) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::Broadcast(frame));
        }
    }

    pub fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Stop);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PluginBroadcaster {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_broadcaster(mut poll: Poll, mut listener: UnixListener, rx: Receiver<Command>) {
    let mut events = Events::with_capacity(128);
    let mut clients: Vec<(Token, UnixStream)> = Vec::new();
    let mut next_token = 0usize;

    loop {
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                Command::Stop => return,
                Command::Broadcast(frame) => broadcast_to_clients(&mut clients, &frame),
            }
        }

        if poll.poll(&mut events, Some(std::time::Duration::from_millis(100))).is_err() {
            continue;
        }

        for event in events.iter() {
            if event.token() == LISTENER_TOKEN {
                while let Ok((mut stream, _addr)) = listener.accept() {
                    let token = Token(next_token);
                    next_token += 1;
                    if poll.registry().register(&mut stream, token, Interest::READABLE).is_ok() {
                        clients.push((token, stream));
                    }
                }
            }
        }
    }
}

fn broadcast_to_clients(clients: &mut Vec<(Token, UnixStream)>, frame: &TelemetryFrame) {
    let Ok(mut line) = serde_json::to_vec(frame) else {
        return;
    };
    line.push(b'\n');
    clients.retain_mut(|(_, stream)| match stream.write_all(&line) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "dropping plugin client after failed write");
            false
        }
    });
}
