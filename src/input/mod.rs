//! Action sources
//!
//! Everything the operator can do to move the robot ends up as an
//! [`ActionEvent`]: panel buttons are resolved by control name, the gamepad
//! is translated by [`gamepad::GamepadMapper`].
//!
//! ```text
//! Panel button ──(name)──────────┐
//!                                ├──► ActionEvent ──► Station::on_action
//! Gamepad ──► GamepadMapper ─────┘
//! ```

pub mod gamepad;

use crate::protocol::{Action, ProtocolError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionEvent {
    pub action: Action,
    pub state: ButtonState,
}

impl ActionEvent {
    pub fn pressed(action: Action) -> Self {
        Self {
            action,
            state: ButtonState::Pressed,
        }
    }

    pub fn released(action: Action) -> Self {
        Self {
            action,
            state: ButtonState::Released,
        }
    }

    /// Resolves a panel control by its name (`goForward`, `raise_f`, ...)
    pub fn from_control(name: &str, state: ButtonState) -> Result<Self, ProtocolError> {
        let action = name.parse()?;
        Ok(Self { action, state })
    }
}
