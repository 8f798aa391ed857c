//! Gamepad action source
//!
//! Two parts:
//!
//! 1. [`GamepadMapper`] - pure translation of pad buttons and stick axes into
//!    [`ActionEvent`]s, driven by the bindings in [`GamepadSettings`]
//! 2. [`GamepadSource`] - gilrs collector running on its own thread,
//!    feeding the mapper and forwarding the result to the station
//!
//! Sticks behave like buttons: crossing the threshold presses the bound
//! action, returning to the center (or flipping direction) releases it.

use crate::input::{ActionEvent, ButtonState};
use crate::protocol::{Action, ActuatorAction, ActuatorSide, ChassisAction, DriveAction};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PadButton {
    South,
    East,
    North,
    West,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    Select,
    Start,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PadAxis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PadEvent {
    Button(PadButton, ButtonState),
    Axis(PadAxis, f32),
}

/// Actions bound to the two directions of a stick axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBinding {
    pub positive: Action,
    pub negative: Action,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadSettings {
    /// Start the gamepad source together with the station
    pub enabled: bool,
    /// Stick deflection ignored around the center (0.0-1.0)
    pub deadzone: f32,
    /// Deflection after deadzone rescaling that counts as a press
    pub axis_threshold: f32,
    /// Sleep between two polls of an empty gilrs queue
    pub poll_interval_ms: u64,
    pub buttons: BTreeMap<PadButton, Action>,
    pub axes: BTreeMap<PadAxis, AxisBinding>,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        use ActuatorAction::*;
        use ActuatorSide::*;

        let buttons = BTreeMap::from([
            (PadButton::DPadUp, Action::Drive(DriveAction::Forward)),
            (PadButton::DPadDown, Action::Drive(DriveAction::Backward)),
            (PadButton::DPadRight, Action::Drive(DriveAction::TurnClockwise)),
            (PadButton::DPadLeft, Action::Drive(DriveAction::TurnCounterClockwise)),
            (PadButton::North, Action::Chassis(ChassisAction::Raise)),
            (PadButton::South, Action::Chassis(ChassisAction::Lower)),
            (PadButton::LeftBumper, Action::Actuator(Front, Raise)),
            (PadButton::LeftTrigger, Action::Actuator(Front, Lower)),
            (PadButton::West, Action::Actuator(Front, Mine)),
            (PadButton::East, Action::Actuator(Front, Dump)),
            (PadButton::RightBumper, Action::Actuator(Rear, Raise)),
            (PadButton::RightTrigger, Action::Actuator(Rear, Lower)),
            (PadButton::LeftStick, Action::Actuator(Rear, Mine)),
            (PadButton::RightStick, Action::Actuator(Rear, Dump)),
        ]);
        let axes = BTreeMap::from([
            (
                PadAxis::LeftStickY,
                AxisBinding {
                    positive: Action::Drive(DriveAction::Forward),
                    negative: Action::Drive(DriveAction::Backward),
                },
            ),
            (
                PadAxis::LeftStickX,
                AxisBinding {
                    positive: Action::Drive(DriveAction::TurnClockwise),
                    negative: Action::Drive(DriveAction::TurnCounterClockwise),
                },
            ),
        ]);

        Self {
            enabled: true,
            deadzone: 0.05,
            axis_threshold: 0.5,
            poll_interval_ms: 1,
            buttons,
            axes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GamepadError {
    #[error("Failed to initialize gamepad input: {0}")]
    InitializationError(String),

    #[error("Action channel closed")]
    ChannelClosed,
}

/// Translates pad events into action events
#[derive(Debug, Clone)]
pub struct GamepadMapper {
    buttons: HashMap<PadButton, Action>,
    axes: HashMap<PadAxis, AxisBinding>,
    deadzone: f32,
    axis_threshold: f32,
    held_buttons: HashSet<PadButton>,
    active_axes: HashMap<PadAxis, Action>,
}

impl GamepadMapper {
    pub fn new(settings: &GamepadSettings) -> Self {
        Self {
            buttons: settings.buttons.clone().into_iter().collect(),
            axes: settings.axes.clone().into_iter().collect(),
            deadzone: settings.deadzone,
            axis_threshold: settings.axis_threshold,
            held_buttons: HashSet::new(),
            active_axes: HashMap::new(),
        }
    }

    pub fn map(&mut self, event: PadEvent) -> Vec<ActionEvent> {
        match event {
            PadEvent::Button(button, state) => self.map_button(button, state),
            PadEvent::Axis(axis, value) => self.map_axis(axis, value),
        }
    }

    /// Releases everything currently held, e.g. when the pad disappears
    pub fn release_all(&mut self) -> Vec<ActionEvent> {
        let mut released: Vec<ActionEvent> = self
            .held_buttons
            .drain()
            .filter_map(|button| self.buttons.get(&button).copied())
            .map(ActionEvent::released)
            .collect();
        released.extend(self.active_axes.drain().map(|(_, a)| ActionEvent::released(a)));
        released
    }

    fn map_button(&mut self, button: PadButton, state: ButtonState) -> Vec<ActionEvent> {
        let Some(action) = self.buttons.get(&button).copied() else {
            debug!("No action bound to {:?}", button);
            return Vec::new();
        };

        let changed = match state {
            ButtonState::Pressed => self.held_buttons.insert(button),
            ButtonState::Released => self.held_buttons.remove(&button),
        };
        if !changed {
            debug!("Ignoring repeated {:?} {:?}", button, state);
            return Vec::new();
        }

        vec![ActionEvent { action, state }]
    }

    fn map_axis(&mut self, axis: PadAxis, value: f32) -> Vec<ActionEvent> {
        let Some(binding) = self.axes.get(&axis).copied() else {
            return Vec::new();
        };

        let value = apply_deadzone(value, self.deadzone);
        let target = if value >= self.axis_threshold {
            Some(binding.positive)
        } else if value <= -self.axis_threshold {
            Some(binding.negative)
        } else {
            None
        };

        let current = self.active_axes.get(&axis).copied();
        if target == current {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if let Some(previous) = current {
            events.push(ActionEvent::released(previous));
        }
        match target {
            Some(action) => {
                self.active_axes.insert(axis, action);
                events.push(ActionEvent::pressed(action));
            }
            None => {
                self.active_axes.remove(&axis);
            }
        }
        events
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SourceState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct GamepadSource<S: SourceState> {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    mapper: GamepadMapper,
    sender: mpsc::Sender<ActionEvent>,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl GamepadSource<Initializing> {
    pub fn create(
        settings: &GamepadSettings,
        sender: mpsc::Sender<ActionEvent>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, GamepadError> {
        info!("Initializing gilrs gamepad interface");
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            GamepadError::InitializationError(e.to_string())
        })?;

        Ok(Self::new(
            gilrs,
            None,
            GamepadMapper::new(settings),
            sender,
            Duration::from_millis(settings.poll_interval_ms),
            shutdown,
        ))
    }

    /// Picks the first connected gamepad and starts collecting
    pub fn initialize(mut self) -> GamepadSource<Collecting> {
        let first = self
            .gilrs
            .gamepads()
            .next()
            .map(|(id, gamepad)| (id, gamepad.name().to_string()));
        match first {
            Some((id, name)) => {
                info!("Selected gamepad: {} ({})", name, id);
                self.active_gamepad = Some(id);
            }
            None => warn!("No gamepad connected, waiting for one"),
        }
        self.transition()
    }
}

impl GamepadSource<Collecting> {
    /// Handles one queued gilrs event, returns false when the queue was empty
    pub fn collect_next_event(&mut self) -> Result<bool, GamepadError> {
        let Some(Event { id, event, .. }) = self.gilrs.next_event() else {
            return Ok(false);
        };

        match event {
            EventType::Connected if self.active_gamepad.is_none() => {
                info!("Gamepad {} connected, selecting it", id);
                self.active_gamepad = Some(id);
                return Ok(true);
            }
            EventType::Disconnected if self.active_gamepad == Some(id) => {
                warn!("Active gamepad {} disconnected, releasing held actions", id);
                self.active_gamepad = None;
                let released = self.mapper.release_all();
                self.forward(released)?;
                return Ok(true);
            }
            _ => {}
        }

        if self.active_gamepad != Some(id) {
            debug!("Skipping event from non-active gamepad: {:?}", id);
            return Ok(true);
        }

        if let Some(pad_event) = convert_event(event) {
            let actions = self.mapper.map(pad_event);
            self.forward(actions)?;
        }
        Ok(true)
    }

    pub fn run_collection_loop(&mut self) -> Result<(), GamepadError> {
        info!("Starting gamepad collection loop");
        while !self.shutdown.load(Ordering::Acquire) {
            if !self.collect_next_event()? {
                std::thread::sleep(self.poll_interval);
            }
        }
        info!("Gamepad collection loop stopped");
        Ok(())
    }

    fn forward(&self, events: Vec<ActionEvent>) -> Result<(), GamepadError> {
        for event in events {
            debug!("Gamepad action: {:?}", event);
            self.sender
                .blocking_send(event)
                .map_err(|_| GamepadError::ChannelClosed)?;
        }
        Ok(())
    }
}

/// Runs a [`GamepadSource`] on a dedicated thread
#[derive(Debug)]
pub struct GamepadHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl GamepadHandle {
    pub fn spawn(
        settings: GamepadSettings,
        sender: mpsc::Sender<ActionEvent>,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        // gilrs is created on the thread that polls it
        let thread = std::thread::Builder::new()
            .name("gamepad".to_string())
            .spawn(move || match GamepadSource::create(&settings, sender, flag) {
                Ok(source) => {
                    let mut collecting = source.initialize();
                    if let Err(e) = collecting.run_collection_loop() {
                        warn!("Gamepad source terminated: {}", e);
                    }
                }
                Err(e) => error!("Gamepad source unavailable: {}", e),
            })?;

        info!("Gamepad source started");
        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for GamepadHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Gamepad thread panicked");
            }
        }
    }
}

fn convert_event(event: EventType) -> Option<PadEvent> {
    match event {
        EventType::ButtonPressed(button, _) => {
            map_button(button).map(|b| PadEvent::Button(b, ButtonState::Pressed))
        }
        EventType::ButtonReleased(button, _) => {
            map_button(button).map(|b| PadEvent::Button(b, ButtonState::Released))
        }
        EventType::AxisChanged(axis, value, _) => {
            map_axis(axis).map(|a| PadEvent::Axis(a, value))
        }
        _ => None,
    }
}

fn map_button(button: Button) -> Option<PadButton> {
    match button {
        Button::South => Some(PadButton::South),
        Button::East => Some(PadButton::East),
        Button::North => Some(PadButton::North),
        Button::West => Some(PadButton::West),
        Button::LeftTrigger => Some(PadButton::LeftBumper),
        Button::RightTrigger => Some(PadButton::RightBumper),
        Button::LeftTrigger2 => Some(PadButton::LeftTrigger),
        Button::RightTrigger2 => Some(PadButton::RightTrigger),
        Button::Select => Some(PadButton::Select),
        Button::Start => Some(PadButton::Start),
        Button::LeftThumb => Some(PadButton::LeftStick),
        Button::RightThumb => Some(PadButton::RightStick),
        Button::DPadUp => Some(PadButton::DPadUp),
        Button::DPadDown => Some(PadButton::DPadDown),
        Button::DPadLeft => Some(PadButton::DPadLeft),
        Button::DPadRight => Some(PadButton::DPadRight),
        _ => None,
    }
}

fn map_axis(axis: Axis) -> Option<PadAxis> {
    match axis {
        Axis::LeftStickX => Some(PadAxis::LeftStickX),
        Axis::LeftStickY => Some(PadAxis::LeftStickY),
        Axis::RightStickX => Some(PadAxis::RightStickX),
        Axis::RightStickY => Some(PadAxis::RightStickY),
        _ => None,
    }
}

/// Zeroes small deflections and rescales the rest to the full range
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> GamepadMapper {
        GamepadMapper::new(&GamepadSettings::default())
    }

    const FORWARD: Action = Action::Drive(DriveAction::Forward);
    const BACKWARD: Action = Action::Drive(DriveAction::Backward);

    #[test]
    fn test_button_press_and_release() {
        let mut mapper = mapper();
        let front_raise = Action::Actuator(ActuatorSide::Front, ActuatorAction::Raise);

        assert_eq!(
            mapper.map(PadEvent::Button(PadButton::LeftBumper, ButtonState::Pressed)),
            vec![ActionEvent::pressed(front_raise)]
        );
        assert_eq!(
            mapper.map(PadEvent::Button(PadButton::LeftBumper, ButtonState::Released)),
            vec![ActionEvent::released(front_raise)]
        );
    }

    #[test]
    fn test_repeated_press_is_ignored() {
        let mut mapper = mapper();
        let press = PadEvent::Button(PadButton::North, ButtonState::Pressed);
        assert_eq!(mapper.map(press).len(), 1);
        assert!(mapper.map(press).is_empty());
    }

    #[test]
    fn test_unbound_button_is_ignored() {
        let mut mapper = mapper();
        assert!(mapper
            .map(PadEvent::Button(PadButton::Start, ButtonState::Pressed))
            .is_empty());
    }

    #[test]
    fn test_stick_crossing_threshold_presses_once() {
        let mut mapper = mapper();
        assert!(mapper.map(PadEvent::Axis(PadAxis::LeftStickY, 0.2)).is_empty());
        assert_eq!(
            mapper.map(PadEvent::Axis(PadAxis::LeftStickY, 0.8)),
            vec![ActionEvent::pressed(FORWARD)]
        );
        assert!(mapper.map(PadEvent::Axis(PadAxis::LeftStickY, 0.9)).is_empty());
        assert_eq!(
            mapper.map(PadEvent::Axis(PadAxis::LeftStickY, 0.01)),
            vec![ActionEvent::released(FORWARD)]
        );
    }

    #[test]
    fn test_stick_flip_releases_before_pressing() {
        let mut mapper = mapper();
        mapper.map(PadEvent::Axis(PadAxis::LeftStickY, 1.0));
        assert_eq!(
            mapper.map(PadEvent::Axis(PadAxis::LeftStickY, -1.0)),
            vec![
                ActionEvent::released(FORWARD),
                ActionEvent::pressed(BACKWARD)
            ]
        );
    }

    #[test]
    fn test_release_all_after_disconnect() {
        let mut mapper = mapper();
        mapper.map(PadEvent::Axis(PadAxis::LeftStickY, 1.0));
        mapper.map(PadEvent::Button(PadButton::North, ButtonState::Pressed));

        let mut released = mapper.release_all();
        released.sort_by_key(|e| e.action.to_string());
        assert_eq!(
            released,
            vec![
                ActionEvent::released(FORWARD),
                ActionEvent::released(Action::Chassis(ChassisAction::Raise)),
            ]
        );
        assert!(mapper.release_all().is_empty());
    }

    #[test]
    fn test_deadzone_rescaling() {
        assert_eq!(apply_deadzone(0.04, 0.05), 0.0);
        assert_eq!(apply_deadzone(1.0, 0.05), 1.0);
        assert_eq!(apply_deadzone(-1.0, 0.05), -1.0);
    }

    #[test]
    fn test_settings_round_trip_through_toml() {
        let settings = GamepadSettings::default();
        let text = toml::to_string(&settings).unwrap();
        assert!(text.contains("DPadUp = \"goForward\""));
        let parsed: GamepadSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
