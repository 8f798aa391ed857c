//! Non-blocking liveness probe
//!
//! A blocking read cannot tell an idle peer from one that has shut down
//! until the read returns. The probe peeks one byte with an immediate
//! deadline:
//!
//! - deadline hit: nothing to read, peer idle but open
//! - bytes waiting: open
//! - zero bytes: orderly shutdown by the peer
//! - error: connection broken

use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tracing::debug;

/// How long the probe waits for the socket to become readable
pub const PROBE_WINDOW: Duration = Duration::from_micros(1);

pub async fn probe(reader: &mut OwnedReadHalf) -> bool {
    let mut byte = [0u8; 1];
    match tokio::time::timeout(PROBE_WINDOW, reader.peek(&mut byte)).await {
        Err(_) => true,
        Ok(Ok(0)) => {
            debug!("Liveness probe: peer performed an orderly shutdown");
            false
        }
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Liveness probe failed: {}", e);
            false
        }
    }
}
