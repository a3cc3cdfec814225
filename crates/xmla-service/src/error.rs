//! Service-layer error types.
//!
//! `ServiceError` is transport-agnostic. The HTTP crate maps each variant to
//! its status code and JSON error body.

/// Request rejected before any connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required transport header is absent or blank.
    #[error("{0} header is required")]
    MissingHeader(&'static str),

    /// A required header is present but its value is not UTF-8.
    #[error("{0} header is not valid UTF-8")]
    InvalidHeader(&'static str),

    /// The request body is missing, malformed, or violates a payload rule.
    #[error("{0}")]
    InvalidBody(String),
}

impl ValidationError {
    /// Error category reported in the `error` field of the response body.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingHeader(_) | Self::InvalidHeader(_) => "Invalid header",
            Self::InvalidBody(_) => "Invalid body",
        }
    }

    pub(crate) fn body(detail: impl Into<String>) -> Self {
        Self::InvalidBody(detail.into())
    }
}

/// Service error shared across transports.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Headers or payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Opening the remote connection failed.
    #[error("{0}")]
    Connection(String),

    /// Anything else that went wrong while the pipeline was running.
    #[error("{0}")]
    Internal(String),
}
