//! Content-level protocol errors
//!
//! None of these touch the connection state. They are logged where they occur
//! and the caller carries on.

use thiserror::Error;

/// Errors raised while turning operator input into commands
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The action name is not part of the command table
    #[error("Unrecognized action: {0}")]
    UnrecognizedAction(String),
}

/// Errors raised while decoding an inbound telemetry frame
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A `BATT` frame arrived without a voltage payload
    #[error("Battery frame has no payload: {frame:?}")]
    EmptyBatteryPayload { frame: String },

    /// The `BATT` payload is not a floating point number
    #[error("Invalid battery voltage {payload:?} in frame {frame:?}")]
    InvalidBatteryVoltage { payload: String, frame: String },
}
