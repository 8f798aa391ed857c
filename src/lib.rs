//! Control station for the ARES mining robot
//!
//! Keeps one TCP session with the robot, turns operator actions into the
//! single-character command protocol and decodes the telemetry the robot
//! sends back.
//!
//! ```text
//! Panel / Gamepad ──► input ──► coordinator ──► protocol::command ──► session ──► Robot
//!                                                                        │
//! EventSink ◄── protocol::telemetry ◄── receive task ◄───────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod coordinator;
pub mod events;
pub mod input;
pub mod poller;
pub mod protocol;
pub mod session;
pub mod station;

pub use config::StationConfig;
pub use events::{EventSink, LogLine, StationEvent};
pub use station::Station;
