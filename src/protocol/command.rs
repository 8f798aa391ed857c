//! Outbound command encoding
//!
//! Every operator action maps to exactly one press command. Releasing any
//! action sends the shared stop command `*`, except the chassis lift which
//! has its own stop `y`.

use crate::protocol::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Appended to every command on the wire
pub const COMMAND_TERMINATOR: char = ';';

/// Press commands of the drum actuators, indexed by `[side][action]`
const ACTUATOR_COMMANDS: [[char; 4]; 2] = [
    // Raise, Lower, Mine, Dump
    ['z', 'x', 'p', 'l'], // Front
    ['c', 'f', 'o', 'k'], // Rear
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveAction {
    Forward,
    Backward,
    TurnClockwise,
    TurnCounterClockwise,
}

/// Lifts or lowers the whole chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChassisAction {
    Raise,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorSide {
    Front,
    Rear,
}

impl ActuatorSide {
    pub fn opposite(self) -> Self {
        match self {
            ActuatorSide::Front => ActuatorSide::Rear,
            ActuatorSide::Rear => ActuatorSide::Front,
        }
    }

    fn index(self) -> usize {
        match self {
            ActuatorSide::Front => 0,
            ActuatorSide::Rear => 1,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ActuatorSide::Front => "f",
            ActuatorSide::Rear => "r",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorAction {
    Raise,
    Lower,
    Mine,
    Dump,
}

impl ActuatorAction {
    fn index(self) -> usize {
        match self {
            ActuatorAction::Raise => 0,
            ActuatorAction::Lower => 1,
            ActuatorAction::Mine => 2,
            ActuatorAction::Dump => 3,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            ActuatorAction::Raise => "raise",
            ActuatorAction::Lower => "lower",
            ActuatorAction::Mine => "mine",
            ActuatorAction::Dump => "dump",
        }
    }
}

/// A logical operator action, independent of where it came from
///
/// Buttons, console lines and gamepad bindings all resolve to one of these.
/// The textual names (`goForward`, `raise_f`, ...) are the control names of
/// the station panel and are used in config files and on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    Drive(DriveAction),
    Chassis(ChassisAction),
    Actuator(ActuatorSide, ActuatorAction),
}

impl Action {
    /// Every action the station can send, in panel order
    pub const ALL: [Action; 14] = [
        Action::Drive(DriveAction::Forward),
        Action::Drive(DriveAction::Backward),
        Action::Drive(DriveAction::TurnClockwise),
        Action::Drive(DriveAction::TurnCounterClockwise),
        Action::Chassis(ChassisAction::Raise),
        Action::Chassis(ChassisAction::Lower),
        Action::Actuator(ActuatorSide::Front, ActuatorAction::Raise),
        Action::Actuator(ActuatorSide::Front, ActuatorAction::Lower),
        Action::Actuator(ActuatorSide::Front, ActuatorAction::Mine),
        Action::Actuator(ActuatorSide::Front, ActuatorAction::Dump),
        Action::Actuator(ActuatorSide::Rear, ActuatorAction::Raise),
        Action::Actuator(ActuatorSide::Rear, ActuatorAction::Lower),
        Action::Actuator(ActuatorSide::Rear, ActuatorAction::Mine),
        Action::Actuator(ActuatorSide::Rear, ActuatorAction::Dump),
    ];

    /// The same actuator action on the other side, if this is an actuator action
    pub fn mirrored(self) -> Option<Action> {
        match self {
            Action::Actuator(side, action) => Some(Action::Actuator(side.opposite(), action)),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Drive(DriveAction::Forward) => write!(f, "goForward"),
            Action::Drive(DriveAction::Backward) => write!(f, "goBackward"),
            Action::Drive(DriveAction::TurnClockwise) => write!(f, "turnCW"),
            Action::Drive(DriveAction::TurnCounterClockwise) => write!(f, "turnCCW"),
            Action::Chassis(ChassisAction::Raise) => write!(f, "raiseBot"),
            Action::Chassis(ChassisAction::Lower) => write!(f, "lowerBot"),
            Action::Actuator(side, action) => write!(f, "{}_{}", action.verb(), side.suffix()),
        }
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.to_string() == name)
            .ok_or_else(|| ProtocolError::UnrecognizedAction(name.to_string()))
    }
}

impl TryFrom<String> for Action {
    type Error = ProtocolError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

/// A single command as it goes onto the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Drive(DriveAction),
    Chassis(ChassisAction),
    /// Stops the chassis lift actuators
    ChassisStop,
    Actuator(ActuatorSide, ActuatorAction),
    /// Halts every motor
    Stop,
    BatteryRequest,
    SignalRequest,
    /// Free text typed by the operator, sent verbatim
    Raw(String),
}

impl Command {
    /// Wire symbol of a table command, `None` for raw text
    pub fn symbol(&self) -> Option<char> {
        let symbol = match self {
            Command::Drive(DriveAction::Forward) => '^',
            Command::Drive(DriveAction::Backward) => 'v',
            Command::Drive(DriveAction::TurnClockwise) => '>',
            Command::Drive(DriveAction::TurnCounterClockwise) => '<',
            Command::Chassis(ChassisAction::Raise) => 'u',
            Command::Chassis(ChassisAction::Lower) => 't',
            Command::ChassisStop => 'y',
            Command::Actuator(side, action) => ACTUATOR_COMMANDS[side.index()][action.index()],
            Command::Stop => '*',
            Command::BatteryRequest => 'b',
            Command::SignalRequest => 's',
            Command::Raw(_) => return None,
        };
        Some(symbol)
    }

    /// Payload followed by the terminator
    pub fn to_wire(&self) -> String {
        format!("{}{}", self, COMMAND_TERMINATOR)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.symbol()) {
            (Command::Raw(text), _) => write!(f, "{}", text),
            (_, Some(symbol)) => write!(f, "{}", symbol),
            (_, None) => Ok(()),
        }
    }
}

/// Press command for an action
pub fn encode(action: Action) -> Command {
    match action {
        Action::Drive(drive) => Command::Drive(drive),
        Action::Chassis(chassis) => Command::Chassis(chassis),
        Action::Actuator(side, actuator) => Command::Actuator(side, actuator),
    }
}

/// Release command for an action
pub fn release(action: Action) -> Command {
    match action {
        Action::Chassis(_) => Command::ChassisStop,
        _ => Command::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_press_table_matches_robot_firmware() {
        let expected = [
            ("goForward", '^'),
            ("goBackward", 'v'),
            ("turnCW", '>'),
            ("turnCCW", '<'),
            ("raiseBot", 'u'),
            ("lowerBot", 't'),
            ("raise_f", 'z'),
            ("lower_f", 'x'),
            ("mine_f", 'p'),
            ("dump_f", 'l'),
            ("raise_r", 'c'),
            ("lower_r", 'f'),
            ("mine_r", 'o'),
            ("dump_r", 'k'),
        ];
        for (name, symbol) in expected {
            let action: Action = name.parse().unwrap();
            assert_eq!(encode(action).symbol(), Some(symbol), "action {}", name);
        }
    }

    #[test]
    fn test_press_commands_are_distinct_and_stable() {
        let symbols: HashSet<char> = Action::ALL
            .iter()
            .map(|a| encode(*a).symbol().unwrap())
            .collect();
        assert_eq!(symbols.len(), Action::ALL.len());

        for action in Action::ALL {
            assert_eq!(encode(action), encode(action));
        }
    }

    #[test]
    fn test_every_command_is_in_the_alphabet() {
        let alphabet: HashSet<char> = "^v<>utyzxplcfok*".chars().collect();
        for action in Action::ALL {
            assert!(alphabet.contains(&encode(action).symbol().unwrap()));
            assert!(alphabet.contains(&release(action).symbol().unwrap()));
        }
    }

    #[test]
    fn test_release_uses_shared_stop_except_chassis() {
        assert_eq!(release(Action::Chassis(ChassisAction::Raise)), Command::ChassisStop);
        assert_eq!(release(Action::Chassis(ChassisAction::Lower)), Command::ChassisStop);
        assert_eq!(release(Action::Drive(DriveAction::Forward)), Command::Stop);
        assert_eq!(
            release(Action::Actuator(ActuatorSide::Rear, ActuatorAction::Dump)),
            Command::Stop
        );
    }

    #[test]
    fn test_wire_form_is_terminated() {
        assert_eq!(Command::Drive(DriveAction::Forward).to_wire(), "^;");
        assert_eq!(Command::BatteryRequest.to_wire(), "b;");
        assert_eq!(Command::Raw("^:3".to_string()).to_wire(), "^:3;");
    }

    #[test]
    fn test_unknown_action_name_is_rejected() {
        let result = "warpDrive".parse::<Action>();
        assert_eq!(
            result,
            Err(ProtocolError::UnrecognizedAction("warpDrive".to_string()))
        );
        // Names are case-sensitive
        assert!("RAISE_F".parse::<Action>().is_err());
    }

    #[test]
    fn test_mirrored_only_for_actuators() {
        let front_mine = Action::Actuator(ActuatorSide::Front, ActuatorAction::Mine);
        assert_eq!(
            front_mine.mirrored(),
            Some(Action::Actuator(ActuatorSide::Rear, ActuatorAction::Mine))
        );
        assert_eq!(Action::Drive(DriveAction::Forward).mirrored(), None);
        assert_eq!(Action::Chassis(ChassisAction::Raise).mirrored(), None);
    }
}
