//! HTTP error bodies.
//!
//! Every failure outside the per-query envelope is answered with
//! `{"error": <category>, "detail": <text>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;
use xmla_service::error::{ServiceError, ValidationError};

use crate::encode::json_response;

/// Category reported for connection failures and unexpected errors.
pub const UNHANDLED_ERROR: &str = "An unhandled error occurred";

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error category (e.g. "Invalid header", "Invalid body").
    pub error: String,
    /// Human-readable error detail.
    pub detail: String,
}

/// Errors the HTTP layer knows how to encode.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Header or payload validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request body could not be read (too large, aborted).
    #[error("{detail}")]
    Body { status: StatusCode, detail: String },

    /// Connection failure or any other unexpected error.
    #[error("{0}")]
    Unhandled(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => Self::Validation(e),
            ServiceError::Connection(msg) | ServiceError::Internal(msg) => Self::Unhandled(msg),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Body { status, .. } => *status,
            Self::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let error = match self {
            Self::Validation(e) => e.category(),
            Self::Body { .. } => "Invalid body",
            Self::Unhandled(_) => UNHANDLED_ERROR,
        };
        ErrorBody {
            error: error.to_string(),
            detail: self.to_string(),
        }
    }

    /// Encodes the error, optionally pretty-printed.
    pub fn to_response(&self, pretty: bool) -> Response {
        if let Self::Unhandled(msg) = self {
            tracing::error!(%msg, "request failed");
        }
        json_response(self.status(), &self.body(), pretty)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}
