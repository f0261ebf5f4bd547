use std::io;
use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::errors::ServerError;
use crate::handlers;
use crate::message::RecvBuffer;
use crate::server_state::ServerState;
use crate::types::ConnId;
use crate::users::next_conn_id;

/// Socket reads hand the broker at most this many bytes at a time.
const READ_CHUNK: usize = 512;
/// Depth of the broker's event queue, shared by every reader.
const EVENT_QUEUE_LEN: usize = 1024;
/// Per-client outbound queue: 128 lines of at most 512 bytes, about 64 KiB
/// of pending output before the client counts as too slow to live.
const OUTBOUND_QUEUE_LEN: usize = 128;

/// One readiness event observed by the broker loop.
#[derive(Debug)]
enum Event {
    Line { conn_id: ConnId, line: String },
    Closed { conn_id: ConnId, reason: &'static str },
}

pub struct Server {
    config: Config,
    port: u16,
    password: String,
}

impl Server {
    pub fn new(config: Config, port: u16, password: String) -> Self {
        Self {
            config,
            port,
            password,
        }
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = format!("{}:{}", self.config.network.bind_address, self.port);
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// The broker loop, sole owner of the session registry. Listener
    /// readiness, complete client lines, connection closures and shutdown
    /// signals all arrive here and are handled strictly one at a time, so
    /// no handler ever observes another's intermediate state.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            info!("listening on {addr}");
        }
        let mut sigterm = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_QUEUE_LEN);
        let mut state = ServerState::new(self.config, self.password);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("SIGINT received, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received, shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, addr)) => accept_client(&mut state, socket, addr, &events_tx),
                        Err(err) => warn!("accept failed: {err}"),
                    }
                }
                Some(event) = events_rx.recv() => {
                    match event {
                        Event::Line { conn_id, line } => {
                            handlers::dispatch(&mut state, conn_id, &line);
                        }
                        Event::Closed { conn_id, reason } => {
                            handlers::registration::quit_client(&mut state, conn_id, reason);
                        }
                    }
                    sweep_doomed(&mut state);
                }
            }
        }
        // Dropping the registry closes every outbound queue; writers drain
        // and the sockets close with them.
        Ok(())
    }
}

fn accept_client(
    state: &mut ServerState,
    socket: TcpStream,
    addr: SocketAddr,
    events: &mpsc::Sender<Event>,
) {
    if state.client_count() >= state.config.limits.max_clients {
        warn!("refusing {addr}: client limit reached");
        return;
    }
    let conn_id = next_conn_id();
    info!("[{conn_id}] client connected: {addr}");
    let (reader, writer) = socket.into_split();
    let (tx_outbound, rx_outbound) = mpsc::channel(OUTBOUND_QUEUE_LEN);
    state.add_client(conn_id, addr, tx_outbound);
    tokio::spawn(reader_task(reader, conn_id, events.clone()));
    tokio::spawn(writer_task(writer, conn_id, rx_outbound, events.clone()));
}

/// Owns the read half: reads chunks, buffers them, forwards each complete
/// line to the broker. Exits on EOF, a hard read error or a line-limit
/// violation, reporting the closure as an event.
async fn reader_task(mut reader: OwnedReadHalf, conn_id: ConnId, events: mpsc::Sender<Event>) {
    let mut chunk = [0u8; READ_CHUNK];
    let mut buffer = RecvBuffer::new();
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                let _ = events
                    .send(Event::Closed {
                        conn_id,
                        reason: "connection closed",
                    })
                    .await;
                return;
            }
            Ok(n) => {
                buffer.feed(&chunk[..n]);
                loop {
                    match buffer.next_line() {
                        Ok(Some(line)) => {
                            if events.send(Event::Line { conn_id, line }).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(_) => {
                            warn!("[{conn_id}] line over the 512 byte limit, dropping client");
                            let _ = events
                                .send(Event::Closed {
                                    conn_id,
                                    reason: "input buffer overflow",
                                })
                                .await;
                            return;
                        }
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!("[{conn_id}] read error: {err}");
                let _ = events
                    .send(Event::Closed {
                        conn_id,
                        reason: "read error",
                    })
                    .await;
                return;
            }
        }
    }
}

/// Owns the write half and drains the client's outbound queue. Ends when
/// the broker drops the sender on removal; the socket closes with the half.
async fn writer_task(
    mut writer: OwnedWriteHalf,
    conn_id: ConnId,
    mut outbound: mpsc::Receiver<String>,
    events: mpsc::Sender<Event>,
) {
    while let Some(line) = outbound.recv().await {
        if let Err(err) = writer.write_all(line.as_bytes()).await {
            debug!("[{conn_id}] write error: {err}");
            let _ = events
                .send(Event::Closed {
                    conn_id,
                    reason: "write error",
                })
                .await;
            return;
        }
    }
}

/// Applies deferred disconnects. Clients marked dead during dispatch (full
/// outbound queue, dead writer) are torn down only between events, so a
/// broadcast pass never observes a half-removed member. Teardown itself can
/// doom further clients, hence the loop.
fn sweep_doomed(state: &mut ServerState) {
    loop {
        let doomed = state.take_doomed();
        if doomed.is_empty() {
            return;
        }
        for (conn_id, reason) in doomed {
            info!("[{conn_id}] disconnecting: {reason}");
            handlers::registration::quit_client(state, conn_id, &reason);
        }
    }
}
