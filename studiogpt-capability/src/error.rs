/// Errors produced by capability operations.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// Transport failure or timeout before a response was received.
    #[error("network: {0}")]
    Network(String),

    /// Payload could not be parsed or a value could not be encoded.
    #[error("parse: {0}")]
    Parse(String),

    /// The server answered with a non-success status.
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("timeout: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CapabilityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CapabilityError>;
