//! Error types for the transparency service client.

use std::time::Duration;

use crate::problem::ProblemDetails;

/// SCRAPI client errors.
#[derive(Debug, thiserror::Error)]
pub enum ScrapiError {
    /// No engine variant matches the requested type tag.
    #[error("unknown engine type: {engine_type}")]
    UnknownEngineType { engine_type: String },

    /// The facade has no engine to delegate to.
    #[error("no transparency service engine specified")]
    EngineUnavailable,

    /// The engine exists but reports it cannot accept calls.
    #[error("transparency service engine malfunction: {engine}")]
    EngineUnhealthy { engine: String },

    /// The backend does not implement this operation.
    #[error("operation not supported by {engine}: {operation}")]
    NotSupported { engine: String, operation: String },

    /// The service answered with an error payload.
    #[error("{operation} failed: {problem}")]
    Transport {
        operation: String,
        problem: ProblemDetails,
    },

    /// Registration response carried no operation identifier.
    #[error("registration response has no operation id")]
    MissingOperationId,

    /// The service reported the registration operation as failed.
    #[error("registration failed: operation {operation_id}")]
    RegistrationFailed { operation_id: String },

    /// Operation record could not be decoded or lacks required fields.
    #[error("malformed operation record: {message}")]
    MalformedOperationRecord { message: String },

    /// Signing envelope is not a structurally valid COSE_Sign1.
    #[error("malformed envelope: {message}")]
    MalformedEnvelope { message: String },

    /// Authentication failed or credentials were rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response could not be interpreted.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ScrapiError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Setup issues
            Self::UnknownEngineType { .. } => 1,
            Self::Config { .. } => 1,
            Self::NotSupported { .. } => 1,

            // Auth issues
            Self::Unauthorized { .. } => 2,

            // Engine liveness
            Self::EngineUnavailable => 3,
            Self::EngineUnhealthy { .. } => 3,

            // Service said no
            Self::Transport { .. } => 4,
            Self::RegistrationFailed { .. } => 4,

            // Network/transient
            Self::RateLimited { .. } => 5,
            Self::Network { .. } => 5,

            // Bad payloads
            Self::MissingOperationId => 6,
            Self::MalformedOperationRecord { .. } => 6,
            Self::MalformedEnvelope { .. } => 6,
            Self::InvalidResponse { .. } => 6,
        }
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ScrapiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for SCRAPI operations.
pub type ScrapiResult<T> = Result<T, ScrapiError>;
