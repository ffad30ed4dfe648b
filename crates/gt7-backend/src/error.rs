use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("a non-empty token is required")]
    MissingToken,

    #[error("backend rejected the token ({status})")]
    TokenRejected { status: StatusCode },

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
}

impl BackendError {
    /// The backend answered and said no; asking the operator for another
    /// token may help.
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, Self::TokenRejected { .. } | Self::MissingToken)
    }
}
