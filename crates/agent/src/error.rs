//! Error types for gt7-agent and their exit codes

use std::io;

use gt7_backend::BackendError;
use gt7_capture::CaptureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// The operator interrupted or closed a prompt.
    #[error("cancelled at prompt")]
    Cancelled,

    #[error(transparent)]
    Config(anyhow::Error),

    #[error("{0} is required when stdin is not a terminal")]
    NotInteractive(&'static str),

    #[error("prompt failed")]
    Prompt(#[source] io::Error),

    #[error("token validation failed")]
    TokenValidation(#[source] BackendError),

    #[error("failed to set up backend client")]
    Backend(#[source] BackendError),

    #[error("failed to install interrupt handler")]
    InterruptHandler(#[source] ctrlc::Error),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl AgentError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Cancelled => 0,
            Self::Capture(e) if e.is_socket_setup() => 2,
            Self::TokenValidation(_) => 3,
            Self::Config(_) | Self::NotInteractive(_) => 4,
            Self::Prompt(_) | Self::Backend(_) | Self::InterruptHandler(_) | Self::Capture(_) => 1,
        }
    }
}

impl From<dialoguer::Error> for AgentError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e) => match e.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof => Self::Cancelled,
                _ => Self::Prompt(e),
            },
        }
    }
}
