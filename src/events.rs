//! Events flowing from the core to the presentation layer
//!
//! The presentation layer owns the receiving end of an mpsc channel and gets
//! three kinds of notifications: operator log lines, decoded telemetry and
//! connection state changes (used to enable or disable command controls).

use crate::protocol::TelemetryReading;
use crate::session::SessionState;
use chrono::{DateTime, Local};
use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

/// One line of the operator console
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl LogLine {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            text: text.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StationEvent {
    Log(LogLine),
    Telemetry(TelemetryReading),
    StateChanged(SessionState),
}

/// Cloneable sending side for [`StationEvent`]s
///
/// Never blocks: when the consumer lags behind and the channel is full the
/// event is dropped with a warning, so the receive task keeps reading.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<StationEvent>,
}

impl EventSink {
    pub fn new(sender: mpsc::Sender<StationEvent>) -> Self {
        Self { sender }
    }

    /// Creates a sink together with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }

    pub fn log(&self, text: impl Into<String>) {
        self.emit(StationEvent::Log(LogLine::now(text)));
    }

    pub fn telemetry(&self, reading: TelemetryReading) {
        self.emit(StationEvent::Telemetry(reading));
    }

    pub fn state(&self, state: SessionState) {
        self.emit(StationEvent::StateChanged(state));
    }

    fn emit(&self, event: StationEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Failed to deliver station event: {}", e);
        }
    }
}
