//! Receive task, one per session
//!
//! Frames are processed strictly in arrival order. A frame is whatever one
//! read returns; there is no reassembly across reads.

use crate::events::EventSink;
use crate::protocol::telemetry;
use crate::session::connection::{Session, SessionInner};
use crate::session::error::ReceiveError;
use crate::session::liveness;
use crate::session::state::DisconnectReason;
use std::sync::atomic::Ordering;
use std::sync::Weak;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(super) async fn run(
    mut reader: OwnedReadHalf,
    session: Weak<SessionInner>,
    cancel: CancellationToken,
    events: EventSink,
    buffer_size: usize,
) {
    info!("Receive task started");
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut frames: u64 = 0;

    let failure = loop {
        if cancel.is_cancelled() {
            break None;
        }

        let alive = liveness::probe(&mut reader).await;
        match session.upgrade() {
            Some(inner) => inner.peer_alive.store(alive, Ordering::Release),
            None => break None,
        }
        if !alive {
            break Some(ReceiveError::LivenessLost);
        }

        let read = tokio::select! {
            _ = cancel.cancelled() => break None,
            read = reader.read(&mut buffer) => read,
        };

        match read {
            Ok(0) => break Some(ReceiveError::PeerClosed),
            Ok(n) => {
                frames += 1;
                handle_frame(&buffer[..n], &events);
            }
            Err(e) => break Some(ReceiveError::Read(e)),
        }
    };

    match failure {
        Some(error) => {
            warn!("Receive task stopping after {} frames: {}", frames, error);
            if let Some(inner) = session.upgrade() {
                Session::from_inner(inner)
                    .disconnect_with(DisconnectReason::ReceiveFailed(error.to_string()))
                    .await;
            }
        }
        None => info!("Receive task cancelled after {} frames", frames),
    }
}

fn handle_frame(frame: &[u8], events: &EventSink) {
    events.log(format!("Robot: {}", telemetry::decode(frame)));

    match telemetry::parse(frame) {
        Ok(reading) => {
            debug!("Telemetry: {:?}", reading);
            events.telemetry(reading);
        }
        Err(e) => {
            warn!("Dropping malformed telemetry: {}", e);
            events.log(format!("Problem parsing telemetry: {}", e));
        }
    }
}
