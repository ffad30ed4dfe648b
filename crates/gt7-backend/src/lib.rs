//! Remote side of the GT7 telemetry agent.
//!
//! All calls authenticate with a bearer token:
//!
//! | call | endpoint |
//! |---|---|
//! | [`BackendClient::validate_token`] | `GET {base}/laps/` |
//! | [`BackendClient::heartbeat`] | `POST {base}/session/heartbeat` |
//! | [`BackendClient::upload_lap`] | `POST {base}/laps` |
//!
//! The client is blocking; it is only ever used from the main thread during
//! startup and from the agent's own worker threads.

#![deny(clippy::unwrap_used)]

pub mod client;
pub mod error;
pub mod session;
pub mod sink;

pub use client::{BackendClient, BackendConfig, DEFAULT_BACKEND_URL, DEFAULT_HTTP_TIMEOUT};
pub use error::BackendError;
pub use session::{DEFAULT_HEARTBEAT_INTERVAL, SessionHeartbeat};
pub use sink::RemoteSink;

pub use reqwest::StatusCode;
