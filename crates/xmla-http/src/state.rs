//! HTTP application state: wraps `ServiceState` with HTTP-specific fields.
//!
//! `AppState` provides transparent access to all `ServiceState` methods
//! via `Deref`, and adds transport config like CORS origins and the
//! response formatting switch.

use std::ops::Deref;
use std::sync::Arc;

use xmla_service::ServiceState;

/// Default request body limit (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared HTTP application state, cloneable across handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    service: ServiceState,
    cors_origins: Vec<String>,
    pretty_json: bool,
    max_body_bytes: usize,
}

impl Deref for AppState {
    type Target = ServiceState;

    fn deref(&self) -> &ServiceState {
        &self.inner.service
    }
}

impl AppState {
    /// Creates a new HTTP application state.
    pub fn new(
        service: ServiceState,
        cors_origins: Vec<String>,
        pretty_json: bool,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            inner: Arc::new(AppInner {
                service,
                cors_origins,
                pretty_json,
                max_body_bytes,
            }),
        }
    }

    /// Creates a state with default transport settings (for tests and
    /// embedding).
    pub fn with_defaults(service: ServiceState) -> Self {
        Self::new(service, vec![], true, DEFAULT_MAX_BODY_BYTES)
    }

    /// Returns the configured CORS allowed origins.
    pub fn cors_origins(&self) -> &[String] {
        &self.inner.cors_origins
    }

    /// Whether JSON bodies are pretty-printed.
    pub fn pretty_json(&self) -> bool {
        self.inner.pretty_json
    }

    /// Largest accepted request body, in bytes.
    pub fn max_body_bytes(&self) -> usize {
        self.inner.max_body_bytes
    }
}
