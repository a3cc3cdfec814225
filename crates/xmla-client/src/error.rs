//! Client-side error types.

use xmla_service::engine::EngineError;

/// Failure while talking XMLA to a remote endpoint.
#[derive(Debug, thiserror::Error)]
pub enum XmlaError {
    /// The endpoint URL cannot be turned into an HTTP address.
    #[error("{0}")]
    Endpoint(String),

    /// The HTTP exchange itself failed (connect, reset, body read).
    #[error("XMLA transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint rejected the credentials.
    #[error("XMLA endpoint refused the credentials (HTTP {0})")]
    Unauthorized(u16),

    /// Non-success HTTP status without a SOAP fault to explain it.
    #[error("XMLA endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response is not a well-formed XMLA envelope.
    #[error("malformed XMLA response: {0}")]
    Decode(String),

    /// The engine returned a SOAP fault or an exception rowset.
    #[error("{message}")]
    Fault {
        code: Option<String>,
        message: String,
    },

    /// `BeginSession` was answered without a session id.
    #[error("XMLA endpoint did not return a session id")]
    MissingSession,
}

impl XmlaError {
    /// Maps an error raised while a session is open.
    ///
    /// Transport failures and credential rejections end the session; the
    /// rest leave it usable.
    pub(crate) fn into_session_error(self) -> EngineError {
        match self {
            Self::Fault { code, message } => EngineError::Engine { code, message },
            e @ (Self::Transport(_) | Self::Unauthorized(_)) => {
                EngineError::SessionLost(e.to_string())
            }
            e => EngineError::Client(e.to_string()),
        }
    }
}

impl From<XmlaError> for EngineError {
    fn from(err: XmlaError) -> Self {
        match err {
            XmlaError::Fault { code, message } => EngineError::Engine { code, message },
            e => EngineError::Client(e.to_string()),
        }
    }
}
