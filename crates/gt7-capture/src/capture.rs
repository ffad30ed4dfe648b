//! The receive loop that drives the whole pipeline.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use gt7_protocol::{KEEPALIVE_PORT, MAX_DATAGRAM_SIZE, RECV_PORT, decode, decrypt};
use tracing::{debug, info, trace, warn};

use crate::error::CaptureError;
use crate::keepalive::{DEFAULT_KEEPALIVE_INTERVAL, KeepaliveSender};
use crate::pipeline::LapSubmitter;
use crate::segmenter::LapSegmenter;
use crate::signal::{FailureWatch, WorkerKind};

pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Addresses and timings for one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Local address the telemetry socket binds to.
    pub bind_addr: SocketAddr,
    /// Console address keepalives are sent to.
    pub keepalive_target: SocketAddr,
    pub keepalive_interval: Duration,
    /// Upper bound on one blocking receive.
    pub recv_timeout: Duration,
}

impl CaptureConfig {
    /// Standard ports for a console at `console`.
    pub fn for_console(console: Ipv4Addr) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, RECV_PORT)),
            keepalive_target: SocketAddr::from((console, KEEPALIVE_PORT)),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }
}

/// The two sockets a session needs, bound before any worker starts.
#[derive(Debug)]
pub struct CaptureSockets {
    recv: UdpSocket,
    keepalive: UdpSocket,
}

impl CaptureSockets {
    pub fn bind(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let recv = UdpSocket::bind(config.bind_addr).map_err(|source| CaptureError::BindReceive {
            addr: config.bind_addr,
            source,
        })?;
        recv.set_read_timeout(Some(config.recv_timeout))
            .map_err(CaptureError::Configure)?;
        debug!(addr = %config.bind_addr, "receive socket bound");

        let keepalive_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let keepalive =
            UdpSocket::bind(keepalive_addr).map_err(|source| CaptureError::BindKeepalive {
                addr: keepalive_addr,
                source,
            })?;

        Ok(Self { recv, keepalive })
    }

    pub fn recv_addr(&self) -> io::Result<SocketAddr> {
        self.recv.local_addr()
    }
}

/// Counters kept by the capture loop, logged when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub datagrams: u64,
    pub invalid: u64,
    pub paused_dropped: u64,
    pub samples: u64,
    pub laps_emitted: u64,
    pub keepalives_sent: u64,
}

/// What one iteration of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing arrived before the receive timeout.
    Idle,
    /// A datagram arrived but did not decrypt.
    Invalid,
    /// A sample arrived while the game was paused and was dropped.
    Paused,
    /// A sample was fed to the segmenter.
    Sample,
    /// A sample closed a lap, which was queued for persistence.
    LapQueued,
}

/// Why [`CaptureLoop::run`] returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
}

pub struct CaptureLoop {
    socket: UdpSocket,
    keepalive: KeepaliveSender,
    segmenter: LapSegmenter,
    submitter: LapSubmitter,
    watches: Vec<FailureWatch>,
    stop: Arc<AtomicBool>,
    stats: CaptureStats,
    buf: Vec<u8>,
}

impl CaptureLoop {
    pub fn new(sockets: CaptureSockets, config: &CaptureConfig, submitter: LapSubmitter) -> Self {
        Self {
            socket: sockets.recv,
            keepalive: KeepaliveSender::new(
                sockets.keepalive,
                config.keepalive_target,
                config.keepalive_interval,
            ),
            segmenter: LapSegmenter::new(),
            submitter,
            watches: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
            stats: CaptureStats::default(),
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Stop with an error as soon as this signal is raised.
    pub fn watch(mut self, watch: FailureWatch) -> Self {
        self.watches.push(watch);
        self
    }

    /// Flag that requests a clean stop when set (e.g. from a Ctrl-C handler).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Run until interrupted or until something fails.
    pub fn run(&mut self) -> Result<StopReason, CaptureError> {
        info!(console = %self.keepalive.target(), "capture started");
        loop {
            if self.stop.load(Ordering::Acquire) {
                info!("interrupt received; stopping capture");
                return Ok(StopReason::Interrupted);
            }
            self.step()?;
        }
    }

    /// One iteration: check worker signals, keep the stream alive, then wait
    /// up to the receive timeout for one datagram.
    pub fn step(&mut self) -> Result<Step, CaptureError> {
        if let Some(kind) = self.raised_signal() {
            warn!(worker = %kind, "background worker failed; stopping capture");
            return Err(CaptureError::WorkerFailed(kind));
        }

        if self.keepalive.tick(Instant::now())? {
            self.stats.keepalives_sent += 1;
        }

        let len = match self.socket.recv_from(&mut self.buf) {
            Ok((len, _)) => len,
            Err(e) if is_idle_receive(&e) => return Ok(Step::Idle),
            Err(e) => return Err(CaptureError::Receive(e)),
        };
        self.stats.datagrams += 1;

        let Some(datagram) = self.buf.get(..len) else {
            return Ok(Step::Invalid);
        };
        let record = match decrypt(datagram) {
            Ok(record) => record,
            Err(e) => {
                trace!(error = %e, "dropping datagram");
                self.stats.invalid += 1;
                return Ok(Step::Invalid);
            }
        };

        let sample = decode(&record);
        if sample.paused {
            self.stats.paused_dropped += 1;
            return Ok(Step::Paused);
        }
        self.stats.samples += 1;

        let Some(batch) = self.segmenter.push(sample) else {
            return Ok(Step::Sample);
        };

        info!(lap = %batch.lap_id(), samples = batch.len(), "lap completed");
        self.stats.laps_emitted += 1;
        if let Err(closed) = self.submitter.submit(batch) {
            warn!(lap = %closed.0.lap_id(), "persistence worker has stopped; lap dropped");
            return Err(CaptureError::WorkerFailed(WorkerKind::Persistence));
        }
        Ok(Step::LapQueued)
    }

    fn raised_signal(&self) -> Option<WorkerKind> {
        self.watches
            .iter()
            .find(|w| w.is_raised())
            .map(FailureWatch::kind)
    }

    /// Stop capturing. Dropping the returned submitter lets the persistence
    /// worker drain its queue and exit.
    pub fn finish(self) -> (LapSubmitter, CaptureStats) {
        let stats = self.stats;
        info!(
            datagrams = stats.datagrams,
            invalid = stats.invalid,
            paused_dropped = stats.paused_dropped,
            laps = stats.laps_emitted,
            keepalives = stats.keepalives_sent,
            "capture stopped"
        );
        (self.submitter, stats)
    }
}

/// Receive errors that only mean "nothing this tick". A signal (Ctrl-C)
/// landing during the wait fails the call with `Interrupted`, since a socket
/// with a read timeout is never restarted; the stop flag is checked next.
fn is_idle_receive(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
