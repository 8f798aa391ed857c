use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors while opening a session
///
/// Reported to the operator, never retried automatically.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Failed to resolve {host}: {source}")]
    Resolve { host: String, source: io::Error },

    #[error("No address found for {host}")]
    NoAddress { host: String },

    #[error("Connection to {addr} failed: {source}")]
    Io { addr: String, source: io::Error },

    #[error("Connection to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("Already connected to {0}")]
    AlreadyConnected(String),
}

/// Errors while writing a command
///
/// A write failure has already disconnected the session when this is returned.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Not connected")]
    NotConnected,

    #[error("Failed to send {command:?}: {source}")]
    Write { command: String, source: io::Error },
}

/// Reasons the receive task stopped reading
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("Socket read failed: {0}")]
    Read(#[from] io::Error),

    #[error("Peer closed the connection")]
    PeerClosed,

    #[error("Liveness probe failed")]
    LivenessLost,
}
