//! Connection session with the robot
//!
//! A [`Session`] is one TCP connection, from a successful connect until it
//! is disconnected. Reconnecting always creates a new Session.
//!
//! # Tasks
//!
//! ```text
//!                 ┌──────────────► send() ──► write half
//! Session ────────┤
//!                 └── receive task: liveness probe ─► read ─► telemetry::parse ─► EventSink
//! ```
//!
//! # State Machine
//!
//! ```text
//! Connecting ──► Connected ──► Disconnecting ──► Disconnected
//! ```
//!
//! Any of the operator, a failed send or the receive task may start the
//! disconnect. Only the first one wins, later calls are no-ops.

pub mod connection;
pub mod error;
pub mod liveness;
mod receiver;
pub mod state;

pub use connection::{Session, SessionSettings};
pub use error::{ConnectError, ReceiveError, SendError};
pub use state::{DisconnectReason, SessionState};
