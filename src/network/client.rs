//! RCON client
//!
//! Connects to a server, authenticates, and runs a single reader task that
//! reassembles inbound bytes into command replies and push events.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use super::connection::{CloseError, ConnectionState};
use super::{resolve_host, NetworkConfig};
use crate::dispatch::Observers;
use crate::events::{
    classify_listing, classify_push, Listing, Player, Squad, LIST_PLAYERS_COMMAND,
    LIST_SQUADS_COMMAND,
};
use crate::protocol::{
    encode, Inbound, Reassembler, AUTH_PACKET_ID, EMPTY_PACKET_ID, EXECUTE_COMMAND_ID,
    PACKET_TYPE_AUTH, PACKET_TYPE_COMMAND,
};

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection timeout")]
    Timeout,

    #[error("Failed to send password: {0}")]
    Auth(#[source] io::Error),

    #[error("Connection closed before authentication: {0}")]
    Closed(#[from] CloseError),

    #[error("Reader task ended without reporting an authentication result")]
    ClosedBeforeAuth,
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Reports the outcome of authentication back to `dial`
type AuthSignal = oneshot::Sender<Result<(), CloseError>>;

/// State shared by the handle, the reader task and the keepalive task
struct Shared {
    peer_addr: SocketAddr,
    state: RwLock<ConnectionState>,
    observers: Arc<Observers>,
    writer: Mutex<OwnedWriteHalf>,
    /// Single-slot reply channel. Holding this lock is what makes a call
    /// the one in-flight command.
    responses: Mutex<mpsc::Receiver<String>>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn advance(&self, next: ConnectionState) {
        let mut state = self.state.write();
        if next > *state {
            *state = next;
        }
    }

    async fn execute(&self, command: &str) -> ClientResult<String> {
        let mut responses = self.responses.lock().await;

        if !self.state().is_active() {
            return Ok(String::new());
        }

        // Left behind by a call that was cancelled mid-wait
        while let Ok(stale) = responses.try_recv() {
            tracing::warn!("Discarding unclaimed reply ({} bytes)", stale.len());
        }

        {
            let mut writer = self.writer.lock().await;
            writer
                .write_all(&encode(PACKET_TYPE_COMMAND, EXECUTE_COMMAND_ID, command))
                .await?;
            writer
                .write_all(&encode(PACKET_TYPE_COMMAND, EMPTY_PACKET_ID, ""))
                .await?;
        }

        tracing::debug!("Sent command to {}: {}", self.peer_addr, command);

        Ok(responses.recv().await.unwrap_or_default())
    }
}

/// A live RCON connection
pub struct Rcon {
    shared: Arc<Shared>,
    shutdown_tx: mpsc::Sender<()>,
    reader: Mutex<Option<JoinHandle<()>>>,
    keepalive: Option<JoinHandle<()>>,
}

impl Rcon {
    /// Connect and authenticate with default settings and no observers
    pub async fn dial(host: &str, port: u16, password: &str) -> ClientResult<Self> {
        Self::dial_with(
            NetworkConfig::default(),
            Arc::new(Observers::new()),
            host,
            port,
            password,
        )
        .await
    }

    /// Connect and authenticate.
    ///
    /// Returns once the server has accepted the password. Observers passed
    /// here see push events sent right after authentication.
    pub async fn dial_with(
        config: NetworkConfig,
        observers: Arc<Observers>,
        host: &str,
        port: u16,
        password: &str,
    ) -> ClientResult<Self> {
        let peer_addr = resolve_host(host, port).await?;

        tracing::info!("Connecting to {}", peer_addr);

        let stream = match tokio::time::timeout(
            Duration::from_millis(config.connect_timeout_ms),
            TcpStream::connect(peer_addr),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ClientError::Io(e)),
            Err(_) => return Err(ClientError::Timeout),
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY: {}", e);
        }

        let (read_half, mut write_half) = stream.into_split();

        write_half
            .write_all(&encode(PACKET_TYPE_AUTH, AUTH_PACKET_ID, password))
            .await
            .map_err(ClientError::Auth)?;

        let (response_tx, response_rx) = mpsc::channel(1);
        let (auth_tx, auth_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let shared = Arc::new(Shared {
            peer_addr,
            state: RwLock::new(ConnectionState::Connected),
            observers,
            writer: Mutex::new(write_half),
            responses: Mutex::new(response_rx),
        });

        let reader = tokio::spawn(read_loop(
            shared.clone(),
            read_half,
            Reassembler::new(config.max_packet_size),
            response_tx,
            auth_tx,
            shutdown_rx,
        ));

        match auth_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ClientError::Closed(e)),
            Err(_) => return Err(ClientError::ClosedBeforeAuth),
        }

        tracing::info!("Authenticated with {}", peer_addr);

        if !shared.observers.has_close_observer() {
            tracing::debug!("No close observer registered, a lost connection will exit the process");
        }

        let keepalive = (config.keepalive_interval_ms > 0).then(|| {
            tokio::spawn(keepalive_loop(
                shared.clone(),
                Duration::from_millis(config.keepalive_interval_ms),
                config.keepalive_command.clone(),
            ))
        });

        Ok(Self {
            shared,
            shutdown_tx,
            reader: Mutex::new(Some(reader)),
            keepalive,
        })
    }

    /// Run a command and wait for its complete reply.
    ///
    /// Calls are serialized. Once the connection has closed this returns an
    /// empty string. Replies to `ListPlayers` and `ListSquads` are also
    /// delivered to the matching list observer.
    pub async fn execute(&self, command: &str) -> ClientResult<String> {
        let (body, _) = self.execute_listing(command).await?;
        Ok(body)
    }

    /// Run `ListPlayers` and parse the rows
    pub async fn list_players(&self) -> ClientResult<Vec<Player>> {
        match self.execute_listing(LIST_PLAYERS_COMMAND).await? {
            (_, Some(Listing::Players(players))) => Ok(players),
            _ => Ok(Vec::new()),
        }
    }

    /// Run `ListSquads` and parse the rows
    pub async fn list_squads(&self) -> ClientResult<Vec<Squad>> {
        match self.execute_listing(LIST_SQUADS_COMMAND).await? {
            (_, Some(Listing::Squads(squads))) => Ok(squads),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute_listing(&self, command: &str) -> ClientResult<(String, Option<Listing>)> {
        let body = self.shared.execute(command).await?;
        let listing = classify_listing(&body, command);

        if let Some(listing) = &listing {
            self.shared.observers.dispatch_listing(listing.clone());
        }

        Ok((body, listing))
    }

    /// Stop the reader and release the socket.
    ///
    /// The close observer is called with `None` before this returns.
    pub async fn close(&self) {
        if let Some(keepalive) = &self.keepalive {
            keepalive.abort();
        }

        let _ = self.shutdown_tx.try_send(());

        if let Some(reader) = self.reader.lock().await.take() {
            if let Err(e) = reader.await {
                tracing::warn!("Reader task failed: {}", e);
            }
        }
    }

    /// Observers for this connection
    pub fn observers(&self) -> &Observers {
        &self.shared.observers
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Check if the server accepted the password and the connection is up
    pub fn is_authenticated(&self) -> bool {
        self.state() == ConnectionState::Authenticated
    }

    /// Address of the server
    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer_addr
    }
}

impl Drop for Rcon {
    fn drop(&mut self) {
        if let Some(keepalive) = &self.keepalive {
            keepalive.abort();
        }
    }
}

impl std::fmt::Debug for Rcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rcon")
            .field("peer_addr", &self.shared.peer_addr)
            .field("state", &self.state())
            .finish()
    }
}

async fn read_loop(
    shared: Arc<Shared>,
    mut reader: OwnedReadHalf,
    mut reassembler: Reassembler,
    responses: mpsc::Sender<String>,
    auth_tx: AuthSignal,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut auth_tx = Some(auth_tx);
    let mut buf = [0u8; 4096];

    let outcome = loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        let eof = io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "server closed the connection",
                        );
                        break Some(CloseError::classify(eof));
                    }
                    Ok(n) => {
                        for inbound in reassembler.feed(&buf[..n]) {
                            handle_inbound(&shared, inbound, &responses, &mut auth_tx);
                        }
                    }
                    Err(e) => break Some(CloseError::classify(e)),
                }
            }

            _ = shutdown_rx.recv() => break None,
        }
    };

    shared.advance(ConnectionState::Closed);
    // Unblocks any caller waiting in execute
    drop(responses);
    drop(reader);

    // A caller stuck in write_all holds the writer; never wait on it here
    match shared.writer.try_lock() {
        Ok(mut writer) => {
            if let Err(e) = writer.shutdown().await {
                tracing::trace!("Socket shutdown: {}", e);
            }
        }
        Err(_) => tracing::debug!("Writer busy, skipping socket shutdown"),
    }

    if let Some(auth_tx) = auth_tx.take() {
        if let Some(error) = outcome {
            tracing::debug!("Connection to {} closed during authentication", shared.peer_addr);
            let _ = auth_tx.send(Err(error));
        }
        return;
    }

    match outcome {
        None => {
            tracing::info!("Connection to {} closed", shared.peer_addr);
            shared.observers.dispatch_close(None);
        }
        Some(error) => {
            let reason = error.to_string();
            tracing::warn!("Connection to {} lost: {}", shared.peer_addr, reason);

            if !shared.observers.dispatch_close(Some(error)) {
                tracing::error!("No close observer registered, exiting: {}", reason);
                std::process::exit(1);
            }
        }
    }
}

fn handle_inbound(
    shared: &Shared,
    inbound: Inbound,
    responses: &mpsc::Sender<String>,
    auth_tx: &mut Option<AuthSignal>,
) {
    match inbound {
        Inbound::Response(body) => match responses.try_send(body) {
            Ok(()) => {}
            Err(TrySendError::Full(body)) => {
                tracing::warn!("Dropping reply nobody is waiting for ({} bytes)", body.len());
            }
            Err(TrySendError::Closed(_)) => {}
        },
        Inbound::Push(line) => {
            tracing::trace!("Push from {}: {}", shared.peer_addr, line);

            let event = classify_push(&line);
            shared.observers.dispatch_data(line);

            if let Some(event) = event {
                shared.observers.dispatch_push(event);
            }
        }
        Inbound::Authenticated => {
            shared.advance(ConnectionState::Authenticated);

            if let Some(auth_tx) = auth_tx.take() {
                let _ = auth_tx.send(Ok(()));
            }
        }
    }
}

async fn keepalive_loop(shared: Arc<Shared>, period: Duration, command: String) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        ticker.tick().await;

        match shared.state() {
            ConnectionState::Authenticated => {
                if let Err(e) = shared.execute(&command).await {
                    tracing::debug!("Keepalive to {} failed: {}", shared.peer_addr, e);
                }
            }
            ConnectionState::Closed => break,
            _ => {}
        }
    }
}
