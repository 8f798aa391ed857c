//! Wire protocol spoken with the robot
//!
//! Two directions, both plain ASCII over a single TCP stream:
//!
//! 1. [`command`] - outbound single-character commands, each terminated by `;`
//! 2. [`telemetry`] - inbound frames tagged with a type prefix (`BATT`, `SIG`)
//!
//! # Wire Format
//!
//! ```text
//! Station ──► "z;"  "c;"  "*;"  "b;" ──► Robot
//! Station ◄── "BATT 12.80"  "SIG: 100%" ◄── Robot
//! ```
//!
//! There is no length prefix and no acknowledgment. Inbound frame boundaries
//! are whatever a single socket read returns.

pub mod command;
pub mod error;
pub mod telemetry;

pub use command::{
    encode, release, Action, ActuatorAction, ActuatorSide, ChassisAction, Command, DriveAction,
    COMMAND_TERMINATOR,
};
pub use error::{ParseError, ProtocolError};
pub use telemetry::{parse, TelemetryReading};
