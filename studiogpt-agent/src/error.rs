use studiogpt_capability::CapabilityError;

use crate::guardrails::GuardrailViolation;

/// Errors produced by agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Guardrail(#[from] GuardrailViolation),
}

pub type Result<T> = std::result::Result<T, AgentError>;
