//! Dual-actuator coordinator
//!
//! In dual mode an actuator action on one drum is mirrored onto the other
//! drum. The coordinator first computes every target of an operator event,
//! then encodes them in order, so one press yields at most two commands.

use crate::input::ButtonState;
use crate::protocol::{self, Action, ActuatorAction, ActuatorSide, Command};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct DualActuatorCoordinator {
    dual_mode: bool,
}

impl DualActuatorCoordinator {
    pub fn new(dual_mode: bool) -> Self {
        Self { dual_mode }
    }

    pub fn dual_mode(&self) -> bool {
        self.dual_mode
    }

    pub fn set_dual_mode(&mut self, enabled: bool) {
        debug!("Dual mode {}", if enabled { "on" } else { "off" });
        self.dual_mode = enabled;
    }

    /// The action itself, followed by its mirror when dual mode applies
    pub fn targets(&self, action: Action) -> Vec<Action> {
        let mut targets = vec![action];
        if self.dual_mode {
            targets.extend(action.mirrored());
        }
        targets
    }

    /// Commands for one operator event, in send order
    pub fn dispatch(&self, action: Action, state: ButtonState) -> Vec<Command> {
        self.targets(action)
            .into_iter()
            .map(|target| match state {
                ButtonState::Pressed => protocol::encode(target),
                ButtonState::Released => protocol::release(target),
            })
            .collect()
    }

    pub fn on_press(&self, side: ActuatorSide, action: ActuatorAction) -> Vec<Command> {
        self.dispatch(Action::Actuator(side, action), ButtonState::Pressed)
    }

    pub fn on_release(&self, side: ActuatorSide, action: ActuatorAction) -> Vec<Command> {
        self.dispatch(Action::Actuator(side, action), ButtonState::Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChassisAction, DriveAction};

    fn symbols(commands: &[Command]) -> String {
        commands.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_single_mode_sends_one_command() {
        let coordinator = DualActuatorCoordinator::new(false);
        let commands = coordinator.on_press(ActuatorSide::Front, ActuatorAction::Raise);
        assert_eq!(symbols(&commands), "z");
    }

    #[test]
    fn test_dual_mode_mirrors_front_raise_exactly_once() {
        let coordinator = DualActuatorCoordinator::new(true);
        let commands = coordinator.on_press(ActuatorSide::Front, ActuatorAction::Raise);
        assert_eq!(symbols(&commands), "zc");
    }

    #[test]
    fn test_dual_mode_mirrors_from_rear_side() {
        let coordinator = DualActuatorCoordinator::new(true);
        assert_eq!(
            symbols(&coordinator.on_press(ActuatorSide::Rear, ActuatorAction::Dump)),
            "kl"
        );
        assert_eq!(
            symbols(&coordinator.on_press(ActuatorSide::Rear, ActuatorAction::Mine)),
            "op"
        );
    }

    #[test]
    fn test_dual_mode_release_stops_both_sides() {
        let coordinator = DualActuatorCoordinator::new(true);
        let commands = coordinator.on_release(ActuatorSide::Front, ActuatorAction::Lower);
        assert_eq!(commands, vec![Command::Stop, Command::Stop]);
    }

    #[test]
    fn test_every_actuator_press_is_bounded_by_two() {
        let coordinator = DualActuatorCoordinator::new(true);
        for action in Action::ALL {
            for state in [ButtonState::Pressed, ButtonState::Released] {
                let commands = coordinator.dispatch(action, state);
                let expected = if action.mirrored().is_some() { 2 } else { 1 };
                assert_eq!(commands.len(), expected, "{} {:?}", action, state);
            }
        }
    }

    #[test]
    fn test_drive_and_chassis_never_mirror() {
        let coordinator = DualActuatorCoordinator::new(true);
        assert_eq!(
            coordinator.dispatch(Action::Drive(DriveAction::Forward), ButtonState::Pressed),
            vec![Command::Drive(DriveAction::Forward)]
        );
        assert_eq!(
            coordinator.dispatch(Action::Chassis(ChassisAction::Lower), ButtonState::Released),
            vec![Command::ChassisStop]
        );
    }

    #[test]
    fn test_toggle_dual_mode() {
        let mut coordinator = DualActuatorCoordinator::default();
        assert!(!coordinator.dual_mode());
        coordinator.set_dual_mode(true);
        assert_eq!(
            symbols(&coordinator.on_press(ActuatorSide::Front, ActuatorAction::Mine)),
            "po"
        );
        coordinator.set_dual_mode(false);
        assert_eq!(
            symbols(&coordinator.on_press(ActuatorSide::Front, ActuatorAction::Mine)),
            "p"
        );
    }
}
