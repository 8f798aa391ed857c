use crate::events::EventSink;
use crate::protocol::Command;
use crate::session::error::{ConnectError, SendError};
use crate::session::receiver;
use crate::session::state::{DisconnectReason, SessionState};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tunables of a single session
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Upper bound for name resolution plus TCP handshake
    pub connect_timeout: Duration,
    /// Size of the reusable receive buffer, one frame per read
    pub receive_buffer_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            receive_buffer_size: 256,
        }
    }
}

pub(super) struct SessionInner {
    pub(super) peer: SocketAddr,
    pub(super) state: watch::Sender<SessionState>,
    pub(super) writer: Mutex<Option<OwnedWriteHalf>>,
    pub(super) cancel: CancellationToken,
    pub(super) peer_alive: AtomicBool,
    pub(super) events: EventSink,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Last handle gone: let the receive task exit
        self.cancel.cancel();
    }
}

/// Handle to one live TCP connection with the robot
///
/// Cheap to clone. The receive task only holds a weak reference, so once the
/// last handle is dropped the task stops and the socket is closed.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.inner.peer)
            .field("state", &self.state())
            .finish()
    }
}

impl Session {
    /// Opens a connection and starts the receive task
    ///
    /// On error nothing has been spawned and no event has been emitted.
    pub async fn connect(
        host: &str,
        port: u16,
        settings: SessionSettings,
        events: EventSink,
    ) -> Result<Session, ConnectError> {
        info!("Connecting to {}:{}", host, port);
        let addr = format!("{}:{}", host, port);

        let stream = match tokio::time::timeout(settings.connect_timeout, open_stream(host, port))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("Connection to {} timed out", addr);
                return Err(ConnectError::Timeout {
                    addr,
                    timeout: settings.connect_timeout,
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle on {}: {}", addr, e);
        }
        let peer = stream.peer_addr().map_err(|source| ConnectError::Io {
            addr: addr.clone(),
            source,
        })?;
        let (reader, writer) = stream.into_split();

        let (state, _) = watch::channel(SessionState::Connecting);
        let cancel = CancellationToken::new();
        let inner = Arc::new(SessionInner {
            peer,
            state,
            writer: Mutex::new(Some(writer)),
            cancel: cancel.clone(),
            peer_alive: AtomicBool::new(true),
            events: events.clone(),
        });

        let task_handle = tokio::spawn(receiver::run(
            reader,
            Arc::downgrade(&inner),
            cancel,
            events.clone(),
            settings.receive_buffer_size,
        ));
        debug!("Receive task spawned with handle: {:?}", task_handle);

        inner.state.send_replace(SessionState::Connected);
        info!("Connected to {} ({})", addr, peer);
        events.state(SessionState::Connected);

        Ok(Session { inner })
    }

    pub(super) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    pub fn peer(&self) -> SocketAddr {
        self.inner.peer
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Result of the most recent liveness probe of the receive task
    ///
    /// The receive task owns the read half, so this reports its cached probe
    /// rather than probing again.
    pub fn is_alive(&self) -> bool {
        self.state() == SessionState::Connected && self.inner.peer_alive.load(Ordering::Acquire)
    }

    /// Resolves once the session reached `Disconnected`
    pub async fn closed(&self) {
        let mut receiver = self.subscribe();
        let _ = receiver
            .wait_for(|state| *state == SessionState::Disconnected)
            .await;
    }

    /// Writes one terminated command
    ///
    /// A failed write disconnects the session before the error is returned.
    pub async fn send(&self, command: &Command) -> Result<(), SendError> {
        if !self.state().accepts_commands() {
            debug!("Dropping {:?}, session is {:?}", command, self.state());
            return Err(SendError::NotConnected);
        }

        let wire = command.to_wire();
        self.inner.events.log(format!("GUI: {}", command));

        // A disconnect aborts a write stalled on a peer that stopped reading
        let result = {
            let mut guard = tokio::select! {
                _ = self.inner.cancel.cancelled() => return Err(SendError::NotConnected),
                guard = self.inner.writer.lock() => guard,
            };
            let Some(writer) = guard.as_mut() else {
                return Err(SendError::NotConnected);
            };
            tokio::select! {
                _ = self.inner.cancel.cancelled() => {
                    debug!("Write of {} bytes aborted by disconnect", wire.len());
                    return Err(SendError::NotConnected);
                }
                result = writer.write_all(wire.as_bytes()) => result,
            }
        };

        match result {
            Ok(()) => {
                debug!("Sent {:?} to {}", wire, self.inner.peer);
                Ok(())
            }
            Err(source) => {
                error!("Socket error while sending {:?}: {}", wire, source);
                self.inner
                    .events
                    .log(format!("Socket error, disconnecting: {}", source));
                self.disconnect_with(DisconnectReason::SendFailed(source.to_string()))
                    .await;
                Err(SendError::Write {
                    command: command.to_string(),
                    source,
                })
            }
        }
    }

    /// Operator disconnect, a no-op if already disconnecting
    pub async fn disconnect(&self) {
        self.disconnect_with(DisconnectReason::Operator).await;
    }

    /// Returns false when another path already started the disconnect
    pub(crate) async fn disconnect_with(&self, reason: DisconnectReason) -> bool {
        let started = self.inner.state.send_if_modified(|state| match state {
            SessionState::Connecting | SessionState::Connected => {
                *state = SessionState::Disconnecting;
                true
            }
            SessionState::Disconnecting | SessionState::Disconnected => false,
        });
        if !started {
            debug!(
                "Disconnect ({}) ignored, session already {:?}",
                reason,
                self.state()
            );
            return false;
        }

        info!("Disconnecting from {}: {}", self.inner.peer, reason);
        self.inner.events.state(SessionState::Disconnecting);
        self.inner.cancel.cancel();
        self.inner.peer_alive.store(false, Ordering::Release);

        if let Some(mut writer) = self.inner.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Socket shutdown reported: {}", e);
            }
        }

        self.inner.state.send_replace(SessionState::Disconnected);
        self.inner
            .events
            .log(format!("Disconnected ({})", reason));
        self.inner.events.state(SessionState::Disconnected);
        info!("Session with {} closed", self.inner.peer);
        true
    }
}

async fn open_stream(host: &str, port: u16) -> Result<TcpStream, ConnectError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| ConnectError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();
    debug!("Resolved {} to {:?}", host, addrs);

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(ConnectError::Io {
                    addr: addr.to_string(),
                    source: e,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ConnectError::NoAddress {
        host: host.to_string(),
    }))
}
