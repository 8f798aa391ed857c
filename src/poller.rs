//! Periodic battery poller
//!
//! Sends the battery request at a fixed interval while its session is
//! connected. One poller is bound to exactly one session; a reconnect gets a
//! fresh poller.
//!
//! # State Machine
//!
//! ```text
//! Armed ──► Polling ──► Stopped
//! ```
//!
//! Polling ends on cancellation, when the session disconnects, or when a
//! send fails (which has already disconnected the session).

use crate::protocol::Command;
use crate::session::{Session, SessionState};
use statum::{machine, state};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct PollerSettings {
    pub interval: Duration,
    pub command: Command,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(20_000),
            command: Command::BatteryRequest,
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Armed,
    Polling,
    Stopped,
}

#[machine]
#[derive(Debug)]
pub struct BatteryPoller<S: PollerState> {
    session: Session,
    settings: PollerSettings,
    cancel: CancellationToken,
    sent: u64,
}

impl<S: PollerState> BatteryPoller<S> {
    /// Number of requests written so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl BatteryPoller<Armed> {
    pub fn create(session: Session, settings: PollerSettings, cancel: CancellationToken) -> Self {
        debug!("Arming poller with settings: {:?}", settings);
        Self::new(session, settings, cancel, 0)
    }

    pub fn start(self) -> BatteryPoller<Polling> {
        info!(
            "Polling {} every {} ms",
            self.settings.command,
            self.settings.interval.as_millis()
        );
        self.transition()
    }
}

impl BatteryPoller<Polling> {
    /// First request goes out one interval after start
    pub async fn run_until_stopped(mut self) -> BatteryPoller<Stopped> {
        let period = self.settings.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Poller cancelled");
                    break;
                }
                _ = self.session.closed() => {
                    info!("Poller stopping, session closed");
                    break;
                }
                _ = ticker.tick() => {
                    if self.session.state() != SessionState::Connected {
                        break;
                    }
                    match self.session.send(&self.settings.command).await {
                        Ok(()) => self.sent += 1,
                        Err(e) => {
                            warn!("Poller stopping, request failed: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        debug!("Poller sent {} requests", self.sent);
        self.transition()
    }
}

/// Owns a running poller task
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<u64>>,
}

impl PollerHandle {
    pub fn spawn(session: Session, settings: PollerSettings) -> Self {
        let cancel = CancellationToken::new();
        let poller = BatteryPoller::create(session, settings, cancel.clone()).start();

        let task_handle = tokio::spawn(async move {
            let stopped = poller.run_until_stopped().await;
            stopped.sent()
        });

        Self {
            cancel,
            task_handle: Some(task_handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels the poller and waits for it, returning the number of requests sent
    pub async fn stop(&mut self) -> u64 {
        self.cancel.cancel();
        match self.task_handle.take() {
            Some(handle) => match handle.await {
                Ok(sent) => sent,
                Err(e) => {
                    error!("Poller task panicked: {}", e);
                    0
                }
            },
            None => 0,
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts polling `session` with the battery request every `interval`
pub fn start(session: Session, interval: Duration) -> PollerHandle {
    PollerHandle::spawn(
        session,
        PollerSettings {
            interval,
            ..Default::default()
        },
    )
}
