use std::io;
use std::net::SocketAddr;

use crate::signal::WorkerKind;

/// A keepalive datagram could not be sent. The console stops streaming
/// shortly afterwards, so this ends the session.
#[derive(Debug, thiserror::Error)]
#[error("failed to send keepalive to {target}")]
pub struct KeepaliveError {
    pub target: SocketAddr,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to bind receive socket on {addr}")]
    BindReceive {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind keepalive socket on {addr}")]
    BindKeepalive {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure receive socket")]
    Configure(#[source] io::Error),

    #[error(transparent)]
    Keepalive(#[from] KeepaliveError),

    #[error("receive failed")]
    Receive(#[source] io::Error),

    #[error("{0} worker reported a failure")]
    WorkerFailed(WorkerKind),

    #[error("failed to start {kind} worker")]
    Spawn {
        kind: WorkerKind,
        #[source]
        source: io::Error,
    },
}

impl CaptureError {
    /// Whether the error happened while setting up sockets, before any
    /// datagram was exchanged.
    pub fn is_socket_setup(&self) -> bool {
        matches!(
            self,
            Self::BindReceive { .. } | Self::BindKeepalive { .. } | Self::Configure(_)
        )
    }
}
