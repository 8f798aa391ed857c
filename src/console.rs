//! Operator console
//!
//! Line-oriented stand-in for the control panel. Each stdin line is parsed
//! into a [`ConsoleCommand`] and applied to the [`Station`].

use crate::protocol::{Action, Command, ProtocolError};
use crate::station::Station;
use thiserror::Error;
use tracing::debug;

pub const HELP: &str = "\
commands:
  connect [endpoint|host]   connect to the robot
  disconnect                close the connection
  dual on|off               mirror actuator commands to both sides
  press <action>            press a panel button (goForward, raise_f, ...)
  release <action>          release a panel button
  send <text>               send a custom command
  battery                   request a battery reading
  signal                    request the signal strength
  hosts                     list known endpoints
  help                      show this text
  quit                      exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect(Option<String>),
    Disconnect,
    DualMode(bool),
    Press(Action),
    Release(Action),
    Send(String),
    Battery,
    Signal,
    Hosts,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),
    #[error("Expected on or off, got {0}")]
    InvalidToggle(String),
    #[error(transparent)]
    Action(#[from] ProtocolError),
}

impl ConsoleCommand {
    /// Empty lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = (!rest.is_empty()).then_some(rest);

        let command = match word.to_ascii_lowercase().as_str() {
            "connect" => ConsoleCommand::Connect(argument.map(str::to_string)),
            "disconnect" => ConsoleCommand::Disconnect,
            "dual" => match argument.ok_or(ConsoleError::MissingArgument("dual"))? {
                "on" => ConsoleCommand::DualMode(true),
                "off" => ConsoleCommand::DualMode(false),
                other => return Err(ConsoleError::InvalidToggle(other.to_string())),
            },
            "press" => ConsoleCommand::Press(
                argument.ok_or(ConsoleError::MissingArgument("press"))?.parse()?,
            ),
            "release" => ConsoleCommand::Release(
                argument.ok_or(ConsoleError::MissingArgument("release"))?.parse()?,
            ),
            "send" => ConsoleCommand::Send(
                argument
                    .ok_or(ConsoleError::MissingArgument("send"))?
                    .to_string(),
            ),
            "battery" => ConsoleCommand::Battery,
            "signal" => ConsoleCommand::Signal,
            "hosts" => ConsoleCommand::Hosts,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => return Err(ConsoleError::UnknownCommand(word.to_string())),
        };
        Ok(Some(command))
    }

    /// Applies the command, returns `false` when the operator asked to quit
    ///
    /// Connection and send failures are already reported through the
    /// station's event sink, so they are only traced here.
    pub async fn apply(self, station: &mut Station) -> bool {
        match self {
            ConsoleCommand::Connect(target) => {
                if let Err(e) = station.connect(target.as_deref()).await {
                    debug!("connect: {}", e);
                }
            }
            ConsoleCommand::Disconnect => station.disconnect().await,
            ConsoleCommand::DualMode(enabled) => station.set_dual_mode(enabled),
            ConsoleCommand::Press(action) => {
                if let Err(e) = station.on_action(action, true).await {
                    debug!("press {}: {}", action, e);
                }
            }
            ConsoleCommand::Release(action) => {
                if let Err(e) = station.on_action(action, false).await {
                    debug!("release {}: {}", action, e);
                }
            }
            ConsoleCommand::Send(text) => {
                if let Err(e) = station.send_raw(&text).await {
                    debug!("send: {}", e);
                }
            }
            ConsoleCommand::Battery => {
                if let Err(e) = station.send(&Command::BatteryRequest).await {
                    debug!("battery: {}", e);
                }
            }
            ConsoleCommand::Signal => {
                if let Err(e) = station.send(&Command::SignalRequest).await {
                    debug!("signal: {}", e);
                }
            }
            ConsoleCommand::Hosts => {
                let config = station.config();
                for endpoint in &config.endpoints {
                    let marker = if endpoint.name == config.selected_endpoint {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {:<24} {}", marker, endpoint.name, endpoint.host);
                }
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ActuatorAction, ActuatorSide, DriveAction};

    #[test]
    fn test_parse_connect() {
        assert_eq!(
            ConsoleCommand::parse("connect").unwrap(),
            Some(ConsoleCommand::Connect(None))
        );
        assert_eq!(
            ConsoleCommand::parse("  connect   ares-ethernet ").unwrap(),
            Some(ConsoleCommand::Connect(Some("ares-ethernet".to_string())))
        );
        // endpoint names contain spaces
        assert_eq!(
            ConsoleCommand::parse("connect (TEST) localhost").unwrap(),
            Some(ConsoleCommand::Connect(Some("(TEST) localhost".to_string())))
        );
    }

    #[test]
    fn test_parse_press_and_release() {
        assert_eq!(
            ConsoleCommand::parse("press goForward").unwrap(),
            Some(ConsoleCommand::Press(Action::Drive(DriveAction::Forward)))
        );
        assert_eq!(
            ConsoleCommand::parse("RELEASE mine_r").unwrap(),
            Some(ConsoleCommand::Release(Action::Actuator(
                ActuatorSide::Rear,
                ActuatorAction::Mine
            )))
        );
        assert_eq!(
            ConsoleCommand::parse("press jump"),
            Err(ConsoleError::Action(ProtocolError::UnrecognizedAction(
                "jump".to_string()
            )))
        );
        assert_eq!(
            ConsoleCommand::parse("press"),
            Err(ConsoleError::MissingArgument("press"))
        );
    }

    #[test]
    fn test_parse_dual_toggle() {
        assert_eq!(
            ConsoleCommand::parse("dual on").unwrap(),
            Some(ConsoleCommand::DualMode(true))
        );
        assert_eq!(
            ConsoleCommand::parse("dual off").unwrap(),
            Some(ConsoleCommand::DualMode(false))
        );
        assert_eq!(
            ConsoleCommand::parse("dual maybe"),
            Err(ConsoleError::InvalidToggle("maybe".to_string()))
        );
    }

    #[test]
    fn test_parse_send_keeps_text() {
        assert_eq!(
            ConsoleCommand::parse("send x;y").unwrap(),
            Some(ConsoleCommand::Send("x;y".to_string()))
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
        assert_eq!(
            ConsoleCommand::parse("quit").unwrap(),
            Some(ConsoleCommand::Quit)
        );
        assert_eq!(
            ConsoleCommand::parse("fly"),
            Err(ConsoleError::UnknownCommand("fly".to_string()))
        );
    }
}
