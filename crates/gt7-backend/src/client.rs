//! Blocking HTTP client for the GT Telemetry backend.

use std::time::Duration;

use gt7_capture::LapRecord;
use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::error::BackendError;

pub const DEFAULT_BACKEND_URL: &str = "https://api.gt-telemetry.com";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings shared by every backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub insecure_tls: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_owned(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            insecure_tls: false,
        }
    }
}

/// Authenticated client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    /// Must not be called from inside an async runtime.
    pub fn new(config: &BackendConfig, token: impl Into<String>) -> Result<Self, BackendError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(BackendError::MissingToken);
        }
        if config.insecure_tls {
            warn!("TLS certificate verification is disabled for backend requests");
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("gt7-agent/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(BackendError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Check the token once against the lap listing.
    pub fn validate_token(&self) -> Result<(), BackendError> {
        let url = self.url("/laps/");
        debug!(%url, "validating token");
        let response = self.send(self.http.get(&url), &url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::TokenRejected { status });
        }
        Ok(())
    }

    /// Keep the backend session alive.
    pub fn heartbeat(&self) -> Result<(), BackendError> {
        let url = self.url("/session/heartbeat");
        let response = self.send(self.http.post(&url), &url)?;
        check_status(&response, &url)?;
        debug!("session heartbeat acknowledged");
        Ok(())
    }

    /// Upload one lap as `{"lap_id": ..., "data": [...]}`. Returns the
    /// endpoint it was posted to.
    pub fn upload_lap(&self, lap: &LapRecord) -> Result<String, BackendError> {
        let url = self.url("/laps");
        let response = self.send(self.http.post(&url).json(lap), &url)?;
        check_status(&response, &url)?;
        debug!(lap = %lap.lap_id, "lap uploaded");
        Ok(url)
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, BackendError> {
        request
            .bearer_auth(&self.token)
            .send()
            .map_err(|source| BackendError::Http {
                url: url.to_owned(),
                source,
            })
    }
}

fn check_status(response: &Response, url: &str) -> Result<(), BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(BackendError::Status {
            url: url.to_owned(),
            status,
        })
    }
}
