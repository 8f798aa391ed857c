//! Station facade used by the presentation layer
//!
//! Owns the current [`Session`], its battery poller and the dual-actuator
//! coordinator. Panel buttons, the gamepad and the console all enter through
//! [`Station::on_action`]; everything the operator should see leaves through
//! the [`EventSink`].

use crate::config::StationConfig;
use crate::coordinator::DualActuatorCoordinator;
use crate::events::EventSink;
use crate::input::{ActionEvent, ButtonState};
use crate::poller::PollerHandle;
use crate::protocol::{Action, Command};
use crate::session::{ConnectError, SendError, Session, SessionState};
use tracing::{debug, error, info, warn};

pub struct Station {
    config: StationConfig,
    coordinator: DualActuatorCoordinator,
    session: Option<Session>,
    poller: Option<PollerHandle>,
    events: EventSink,
}

impl Station {
    pub fn new(config: StationConfig, events: EventSink) -> Self {
        let coordinator = DualActuatorCoordinator::new(config.dual_mode);
        Self {
            config,
            coordinator,
            session: None,
            poller: None,
            events,
        }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(Session::state)
            .unwrap_or_default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn dual_mode(&self) -> bool {
        self.coordinator.dual_mode()
    }

    pub fn set_dual_mode(&mut self, enabled: bool) {
        self.coordinator.set_dual_mode(enabled);
        self.events.log(format!(
            "Dual mode {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    /// Connects to an endpoint name or host, `None` uses the selected endpoint
    pub async fn connect(&mut self, target: Option<&str>) -> Result<(), ConnectError> {
        if let Some(session) = &self.session {
            if session.state() != SessionState::Disconnected {
                warn!("Connect requested while {:?}", session.state());
                self.events.log("Error: already connected!");
                return Err(ConnectError::AlreadyConnected(session.peer().to_string()));
            }
        }
        self.stop_poller().await;

        let result = match self.config.resolve_host(target) {
            Some(host) => {
                self.events.log(format!("Connecting to {}..", host));
                self.events.state(SessionState::Connecting);
                Session::connect(
                    &host,
                    self.config.port,
                    self.config.session_settings(),
                    self.events.clone(),
                )
                .await
            }
            None => Err(ConnectError::NoAddress {
                host: target.unwrap_or_default().to_string(),
            }),
        };

        match result {
            Ok(session) => {
                self.events.log("connected!");
                self.poller = Some(PollerHandle::spawn(
                    session.clone(),
                    self.config.poller_settings(),
                ));
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                self.events.log(format!("Problem connecting: {}", e));
                self.events.state(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Safe to call in any state
    pub async fn disconnect(&mut self) {
        self.stop_poller().await;
        match &self.session {
            Some(session) => session.disconnect().await,
            None => debug!("Disconnect requested without a session"),
        }
    }

    pub async fn on_action(&mut self, action: Action, pressed: bool) -> Result<(), SendError> {
        self.handle(ActionEvent {
            action,
            state: ButtonState::from_pressed(pressed),
        })
        .await
    }

    /// Entry point for panel controls addressed by name
    pub async fn on_control(&mut self, name: &str, pressed: bool) -> Result<(), SendError> {
        match ActionEvent::from_control(name, ButtonState::from_pressed(pressed)) {
            Ok(event) => self.handle(event).await,
            Err(e) => {
                warn!("{}", e);
                self.events.log("Unrecognized button.");
                Ok(())
            }
        }
    }

    /// Sends every command of one action event, stopping at the first failure
    pub async fn handle(&mut self, event: ActionEvent) -> Result<(), SendError> {
        let commands = self.coordinator.dispatch(event.action, event.state);
        debug!("{} {:?} -> {:?}", event.action, event.state, commands);
        for command in &commands {
            self.send(command).await?;
        }
        Ok(())
    }

    /// Free text command typed by the operator
    pub async fn send_raw(&mut self, text: &str) -> Result<(), SendError> {
        self.send(&Command::Raw(text.to_string())).await
    }

    pub async fn send(&mut self, command: &Command) -> Result<(), SendError> {
        let Some(session) = self.session.as_ref() else {
            debug!("No session, dropping {:?}", command);
            return Err(SendError::NotConnected);
        };
        let result = session.send(command).await;
        if let Err(SendError::Write { .. }) = &result {
            self.stop_poller().await;
        }
        result
    }

    async fn stop_poller(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            let sent = poller.stop().await;
            info!("Battery poller stopped after {} requests", sent);
        }
    }
}
