//! XMLA Service: core request pipeline for the XMLA query proxy.
//!
//! Validation, connection lifecycle, batch execution, error taxonomy, and
//! metrics. The analytical engine is consumed through the [`engine`]
//! traits; `xmla-client` implements them over XMLA/HTTP.
//!
//! **Zero transport dependencies**: no axum, no wire-protocol code.

pub mod connection;
pub mod engine;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod proxy;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Instant;

use engine::Connector;
use metrics::Metrics;

/// Shared service state, cloneable across handlers.
///
/// Holds only immutable configuration and atomic counters. Nothing about a
/// single request lives here.
#[derive(Clone)]
pub struct ServiceState {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Arc<dyn Connector>,
    metrics: Metrics,
    start_time: Instant,
}

impl ServiceState {
    /// Creates a service state that opens connections through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                metrics: Metrics::new(),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn connector(&self) -> &dyn Connector {
        self.inner.connector.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
