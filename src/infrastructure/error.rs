use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{message}")]
    RemoteRejected { message: String, code: Option<u16> },
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Credential error: {0}")]
    Credential(String),
}

impl InfraError {
    pub fn remote(message: impl Into<String>, code: Option<u16>) -> Self {
        Self::RemoteRejected {
            message: message.into(),
            code,
        }
    }

    /// HTTP status reported by the remote store, if the failure came from one.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::RemoteRejected { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether repeating the same call unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RemoteRejected { .. })
    }
}
