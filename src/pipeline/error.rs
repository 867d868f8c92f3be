//! Setup pipeline error type definitions

use std::fmt;

use axum::http::StatusCode;

/// Errors raised while driving a setup pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Remote call failed before a usable response arrived
    UpstreamUnavailable(String),

    /// Remote call answered with a non-2xx status
    UpstreamError { status_code: u16 },

    /// The selected default project no longer exists remotely
    ProjectNotFound(String),

    /// Another request committed to the same run first
    StateConflict,

    /// The run lapsed or never existed
    ExpiredPipeline,

    /// A step tried to rebind a key owned by another step
    KeyOwned { key: String, owner: String },

    /// Submitted form value failed validation
    InvalidInput(String),

    /// A value an earlier step should have bound is missing
    MissingState(String),

    /// The OAuth identity exchange failed
    IdentityFailed(String),

    /// Handing the finished record to the integration store failed
    Storage(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::UpstreamUnavailable(msg) => write!(f, "Upstream service unavailable: {}", msg),
            PipelineError::UpstreamError { status_code } => {
                write!(f, "Upstream service returned status {}", status_code)
            }
            PipelineError::ProjectNotFound(name) => write!(f, "Project not found: {}", name),
            PipelineError::StateConflict => write!(f, "Setup was modified by another request"),
            PipelineError::ExpiredPipeline => write!(f, "Setup session expired"),
            PipelineError::KeyOwned { key, owner } => {
                write!(f, "State key '{}' is owned by step '{}'", key, owner)
            }
            PipelineError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            PipelineError::MissingState(key) => write!(f, "Missing pipeline state: {}", key),
            PipelineError::IdentityFailed(msg) => write!(f, "Identity verification failed: {}", msg),
            PipelineError::Storage(msg) => write!(f, "Failed to save integration: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    /// Get corresponding HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            PipelineError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::ProjectNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::StateConflict => StatusCode::CONFLICT,
            PipelineError::ExpiredPipeline => StatusCode::GONE,
            PipelineError::KeyOwned { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::MissingState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::IdentityFailed(_) => StatusCode::BAD_REQUEST,
            PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the run can be resumed at the same position after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::UpstreamUnavailable(_) | PipelineError::UpstreamError { .. }
        )
    }

    /// Whether the run is lost and the user has to start setup over
    pub fn requires_restart(&self) -> bool {
        !(self.is_retryable()
            || matches!(
                self,
                PipelineError::InvalidInput(_) | PipelineError::IdentityFailed(_)
            ))
    }

    /// Heading shown on the error page
    pub fn title(&self) -> &'static str {
        match self {
            PipelineError::UpstreamUnavailable(_) | PipelineError::UpstreamError { .. } => {
                "Setup failed"
            }
            PipelineError::ProjectNotFound(_) => "Configuration error",
            PipelineError::StateConflict | PipelineError::ExpiredPipeline => {
                "Please restart setup"
            }
            PipelineError::InvalidInput(_) | PipelineError::IdentityFailed(_) => {
                "Setup could not continue"
            }
            PipelineError::KeyOwned { .. }
            | PipelineError::MissingState(_)
            | PipelineError::Storage(_) => "Internal error",
        }
    }
}
