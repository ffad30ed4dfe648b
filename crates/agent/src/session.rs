//! One capture session: start the workers, run the capture loop on this
//! thread, then shut the workers down.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gt7_backend::{BackendClient, RemoteSink, SessionHeartbeat};
use gt7_capture::{
    CaptureConfig, CaptureLoop, CaptureSockets, CaptureStats, Delivery, LapSink, LocalFileSink,
    PersistedLap, PersistencePipeline, StopReason,
};
use gt7_protocol::ExportMode;
use tracing::debug;

use crate::error::AgentError;
use crate::prompt::print_line;

/// Everything a session needs, resolved before any worker starts.
#[derive(Debug)]
pub struct SessionPlan {
    pub sockets: CaptureSockets,
    pub capture: CaptureConfig,
    pub export_mode: ExportMode,
    pub output_dir: PathBuf,
    /// Upload laps through this client instead of writing files.
    pub backend: Option<BackendClient>,
    pub heartbeat_interval: Duration,
    pub join_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub stop: StopReason,
    pub stats: CaptureStats,
    pub laps_saved: u64,
}

/// Run a session until interrupted or until something fails.
///
/// `install_interrupt` receives the loop's stop flag; the binary hands it to
/// the Ctrl-C handler.
pub fn run(
    plan: SessionPlan,
    install_interrupt: impl FnOnce(Arc<AtomicBool>) -> Result<(), AgentError>,
) -> Result<SessionSummary, AgentError> {
    let heartbeat = match &plan.backend {
        Some(client) => Some(SessionHeartbeat::spawn(
            client.clone(),
            plan.heartbeat_interval,
        )?),
        None => None,
    };

    let sink: Box<dyn LapSink> = match plan.backend {
        Some(client) => Box::new(RemoteSink::new(client)),
        None => Box::new(LocalFileSink::new(plan.output_dir)),
    };
    let laps_saved = Arc::new(AtomicU64::new(0));
    let saved = Arc::clone(&laps_saved);
    let pipeline = PersistencePipeline::new(sink)
        .mode(plan.export_mode)
        .on_persisted(move |lap| {
            announce(lap);
            saved.fetch_add(1, Ordering::Relaxed);
        });
    let (submitter, worker) = match pipeline.spawn() {
        Ok(pair) => pair,
        Err(e) => {
            if let Some(heartbeat) = heartbeat {
                heartbeat.stop(plan.join_timeout);
            }
            return Err(e.into());
        }
    };

    let mut capture =
        CaptureLoop::new(plan.sockets, &plan.capture, submitter).watch(worker.failure_watch());
    if let Some(heartbeat) = &heartbeat {
        capture = capture.watch(heartbeat.failure_watch());
    }

    let result = install_interrupt(capture.stop_flag())
        .and_then(|()| capture.run().map_err(AgentError::from));

    let (submitter, stats) = capture.finish();
    drop(submitter);

    if let Some(heartbeat) = heartbeat {
        let outcome = heartbeat.stop(plan.join_timeout);
        debug!(?outcome, "session heartbeat joined");
    }
    worker.join(plan.join_timeout);

    let stop = result?;
    Ok(SessionSummary {
        stop,
        stats,
        laps_saved: laps_saved.load(Ordering::Relaxed),
    })
}

fn announce(lap: &PersistedLap) {
    let line = match &lap.delivery {
        Delivery::Written { .. } => format!("Lap {} saved locally.", lap.lap_id),
        Delivery::Uploaded { .. } => format!("Lap {} uploaded to backend.", lap.lap_id),
    };
    print_line(&mut io::stdout(), &line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt7_capture::{CaptureError, WorkerKind};
    use gt7_test_helpers::RecordBuilder;
    use gt7_test_helpers::fixtures::reported_last_lap_ms;
    use std::net::UdpSocket;
    use std::thread;
    use std::time::Instant;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn loopback_plan(
        console: &UdpSocket,
        output_dir: PathBuf,
    ) -> Result<SessionPlan, Box<dyn std::error::Error>> {
        let capture = CaptureConfig {
            bind_addr: "127.0.0.1:0".parse()?,
            keepalive_target: console.local_addr()?,
            keepalive_interval: Duration::from_millis(50),
            recv_timeout: Duration::from_millis(20),
        };
        Ok(SessionPlan {
            sockets: CaptureSockets::bind(&capture)?,
            capture,
            export_mode: ExportMode::Track,
            output_dir,
            backend: None,
            heartbeat_interval: Duration::from_secs(60),
            join_timeout: Duration::from_secs(2),
        })
    }

    #[test]
    fn local_session_saves_laps_until_interrupted() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let console = UdpSocket::bind("127.0.0.1:0")?;
        let plan = loopback_plan(&console, tmp.path().join("laps"))?;
        let agent = plan.sockets.recv_addr()?;

        let summary = run(plan, move |stop| {
            thread::spawn(move || {
                for (id, lap) in [0i16, 1, 1, 1, 2, 2, 3].into_iter().enumerate() {
                    let datagram = RecordBuilder::new()
                        .package_id(id as i32)
                        .current_lap(lap)
                        .last_lap_ms(reported_last_lap_ms(lap))
                        .datagram(0xA5A5_0000 | id as u32);
                    if console.send_to(&datagram, agent).is_err() {
                        break;
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                thread::sleep(Duration::from_millis(300));
                stop.store(true, Ordering::Release);
            });
            Ok(())
        })?;

        assert_eq!(summary.stop, StopReason::Interrupted);
        assert_eq!(summary.stats.samples, 7);
        assert_eq!(summary.stats.laps_emitted, 2);
        assert_eq!(summary.laps_saved, 2);
        assert!(summary.stats.keepalives_sent >= 1);
        assert!(tmp.path().join("laps/lap_01-01-000.json").is_file());
        assert!(tmp.path().join("laps/lap_01-02-000.json").is_file());
        Ok(())
    }

    #[test]
    fn failing_interrupt_setup_still_shuts_down() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let console = UdpSocket::bind("127.0.0.1:0")?;
        let plan = loopback_plan(&console, tmp.path().to_path_buf())?;

        let started = Instant::now();
        let err = run(plan, |_| {
            Err(AgentError::Capture(CaptureError::WorkerFailed(
                WorkerKind::Persistence,
            )))
        })
        .err()
        .ok_or("expected failure")?;

        assert_eq!(err.exit_code(), 1);
        assert!(started.elapsed() < Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn unwritable_output_stops_the_session() -> TestResult {
        let tmp = tempfile::tempdir()?;
        // A regular file where the output directory should be.
        let blocked = tmp.path().join("laps");
        std::fs::write(&blocked, b"")?;
        let console = UdpSocket::bind("127.0.0.1:0")?;
        let plan = loopback_plan(&console, blocked)?;
        let agent = plan.sockets.recv_addr()?;

        let err = run(plan, move |_stop| {
            thread::spawn(move || {
                for (id, lap) in [0i16, 1, 1, 2].into_iter().enumerate() {
                    let datagram = RecordBuilder::new()
                        .package_id(id as i32)
                        .current_lap(lap)
                        .last_lap_ms(reported_last_lap_ms(lap))
                        .datagram(0x5A5A_0000 | id as u32);
                    if console.send_to(&datagram, agent).is_err() {
                        break;
                    }
                }
            });
            Ok(())
        })
        .err()
        .ok_or("expected the persistence failure to end the session")?;

        assert!(matches!(
            err,
            AgentError::Capture(CaptureError::WorkerFailed(WorkerKind::Persistence))
        ));
        assert_eq!(err.exit_code(), 1);
        Ok(())
    }
}
