//! Keepalive datagrams that keep the console streaming.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use gt7_protocol::KEEPALIVE_PAYLOAD;
use tracing::trace;

use crate::error::KeepaliveError;

/// Default time between keepalives. The console stops streaming if it hears
/// nothing for a few seconds.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(1500);

/// Send one keepalive datagram to `target`.
pub fn send_keepalive(socket: &UdpSocket, target: SocketAddr) -> Result<(), KeepaliveError> {
    socket
        .send_to(KEEPALIVE_PAYLOAD, target)
        .map_err(|source| KeepaliveError { target, source })?;
    trace!(%target, "keepalive sent");
    Ok(())
}

/// Sends a keepalive whenever more than `interval` has passed since the last
/// one. The first call to [`KeepaliveSender::tick`] always sends.
#[derive(Debug)]
pub struct KeepaliveSender {
    socket: UdpSocket,
    target: SocketAddr,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl KeepaliveSender {
    pub fn new(socket: UdpSocket, target: SocketAddr, interval: Duration) -> Self {
        Self {
            socket,
            target,
            interval,
            last_sent: None,
        }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_sent
            .is_none_or(|last| now.saturating_duration_since(last) > self.interval)
    }

    /// Send if due. Returns whether a datagram went out.
    pub fn tick(&mut self, now: Instant) -> Result<bool, KeepaliveError> {
        if !self.is_due(now) {
            return Ok(false);
        }
        send_keepalive(&self.socket, self.target)?;
        self.last_sent = Some(now);
        Ok(true)
    }
}
