//! Agent configuration: defaults, optional JSON file, CLI overrides.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use gt7_backend::{BackendConfig, DEFAULT_BACKEND_URL};
use gt7_capture::CaptureConfig;
use gt7_capture::sink::DEFAULT_OUTPUT_DIR;
use gt7_protocol::{ExportMode, KEEPALIVE_PORT, RECV_PORT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;

/// Where completed laps go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Console address; prompted for when unset.
    pub console: Option<Ipv4Addr>,
    pub recv_port: u16,
    pub keepalive_port: u16,
    pub keepalive_interval_ms: u64,
    pub recv_timeout_ms: u64,
    pub join_timeout_ms: u64,
    pub output_dir: PathBuf,
    pub export_mode: ExportMode,
    /// Prompted for when unset.
    pub storage: Option<Storage>,
    pub backend_url: String,
    pub heartbeat_interval_secs: u64,
    pub http_timeout_ms: u64,
    pub insecure_tls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            console: None,
            recv_port: RECV_PORT,
            keepalive_port: KEEPALIVE_PORT,
            keepalive_interval_ms: 1500,
            recv_timeout_ms: 100,
            join_timeout_ms: 2000,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            export_mode: ExportMode::Telemetry,
            storage: None,
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            heartbeat_interval_secs: 60,
            http_timeout_ms: 10_000,
            insecure_tls: false,
        }
    }
}

impl AgentConfig {
    /// Load from `path`, or use defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AgentConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Command-line flags and environment win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ip) = cli.ps_ip {
            self.console = Some(ip);
        }
        if cli.track {
            self.export_mode = ExportMode::Track;
        }
        if cli.local {
            self.storage = Some(Storage::Local);
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir.clone_from(dir);
        }
        if let Some(url) = &cli.backend_url {
            self.backend_url.clone_from(url);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.keepalive_interval_ms == 0 {
            bail!("Invalid keepalive interval: {} ms", self.keepalive_interval_ms);
        }
        if self.recv_timeout_ms == 0 {
            bail!("Invalid receive timeout: {} ms", self.recv_timeout_ms);
        }
        if self.join_timeout_ms == 0 {
            bail!("Invalid worker join timeout: {} ms", self.join_timeout_ms);
        }
        if self.heartbeat_interval_secs == 0 {
            bail!(
                "Invalid session heartbeat interval: {} s",
                self.heartbeat_interval_secs
            );
        }
        if self.http_timeout_ms == 0 {
            bail!("Invalid HTTP timeout: {} ms", self.http_timeout_ms);
        }
        if self.output_dir.as_os_str().is_empty() {
            bail!("Output directory must not be empty");
        }
        if self.storage != Some(Storage::Local) && self.backend_url.trim().is_empty() {
            bail!("Backend URL must not be empty when laps may be uploaded");
        }
        Ok(())
    }

    pub fn capture_config(&self, console: Ipv4Addr) -> CaptureConfig {
        CaptureConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.recv_port)),
            keepalive_target: SocketAddr::from((console, self.keepalive_port)),
            keepalive_interval: Duration::from_millis(self.keepalive_interval_ms),
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.backend_url.clone(),
            timeout: Duration::from_millis(self.http_timeout_ms),
            insecure_tls: self.insecure_tls,
        }
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn defaults_match_console_protocol() -> TestResult {
        let config = AgentConfig::default();
        config.validate()?;
        let capture = config.capture_config(Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(capture, CaptureConfig::for_console(Ipv4Addr::new(192, 168, 1, 20)));
        assert_eq!(config.join_timeout(), Duration::from_secs(2));
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(60));
        assert_eq!(config.backend_config(), BackendConfig::default());
        Ok(())
    }

    #[test]
    fn missing_file_argument_gives_defaults() -> TestResult {
        assert_eq!(AgentConfig::load(None)?, AgentConfig::default());
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "console": "10.0.0.7", "export_mode": "track", "storage": "local", "keepalive_interval_ms": 1000 }}"#
        )?;

        let config = AgentConfig::load(Some(file.path()))?;
        assert_eq!(config.console, Some(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(config.export_mode, ExportMode::Track);
        assert_eq!(config.storage, Some(Storage::Local));
        assert_eq!(config.keepalive_interval_ms, 1000);
        assert_eq!(config.recv_port, 33740);
        assert_eq!(config.output_dir, PathBuf::from("laps"));
        Ok(())
    }

    #[test]
    fn unknown_field_is_reported_with_path() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "consol": "10.0.0.7" }}"#)?;

        let err = AgentConfig::load(Some(file.path())).err().ok_or("expected error")?;
        assert!(err.to_string().starts_with("Failed to parse config file"));
        Ok(())
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = AgentConfig::load(Some(Path::new("/nonexistent/gt7-agent.json"))).err();
        assert!(err.is_some());
    }

    #[test]
    fn cli_overrides_file_values() -> TestResult {
        let mut config = AgentConfig {
            console: Some(Ipv4Addr::new(10, 0, 0, 7)),
            backend_url: "https://file.example".into(),
            ..AgentConfig::default()
        };
        let cli = Cli::try_parse_from([
            "gt7-agent",
            "--ps-ip",
            "10.0.0.9",
            "--track",
            "--local",
            "--output-dir",
            "captures",
            "--backend-url",
            "http://127.0.0.1:8080",
        ])?;
        config.apply_cli(&cli);

        assert_eq!(config.console, Some(Ipv4Addr::new(10, 0, 0, 9)));
        assert_eq!(config.export_mode, ExportMode::Track);
        assert_eq!(config.storage, Some(Storage::Local));
        assert_eq!(config.output_dir, PathBuf::from("captures"));
        assert_eq!(config.backend_url, "http://127.0.0.1:8080");
        Ok(())
    }

    #[test]
    fn zero_timings_are_rejected() {
        let cases = [
            AgentConfig { keepalive_interval_ms: 0, ..AgentConfig::default() },
            AgentConfig { recv_timeout_ms: 0, ..AgentConfig::default() },
            AgentConfig { join_timeout_ms: 0, ..AgentConfig::default() },
            AgentConfig { heartbeat_interval_secs: 0, ..AgentConfig::default() },
            AgentConfig { http_timeout_ms: 0, ..AgentConfig::default() },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn empty_backend_url_only_matters_for_uploads() -> TestResult {
        let mut config = AgentConfig {
            backend_url: " ".into(),
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());

        config.storage = Some(Storage::Local);
        config.validate()?;
        Ok(())
    }
}
