//! Connection lifecycle: one engine session per request, released once.
//!
//! [`ManagedConnection`] owns the session. Its `close` consumes the handle,
//! and its `Drop` schedules the close when a handle goes away without one
//! (early return or panic), so every exit path releases the session.

use tracing::{debug, warn};

use crate::engine::{ConnectionDescriptor, Connector, EngineError, EngineSession, Rowset};
use crate::error::ServiceError;
use crate::types::{ConnectionCoordinates, ImpersonationIdentity};

/// Stateless entry point for opening connections.
pub struct ConnectionManager;

impl ConnectionManager {
    /// Opens a session for `identity` against the coordinates' endpoint.
    pub async fn open(
        connector: &dyn Connector,
        coordinates: ConnectionCoordinates,
        identity: &ImpersonationIdentity,
    ) -> Result<ManagedConnection, ServiceError> {
        let descriptor = ConnectionDescriptor::new(coordinates, identity);
        debug!(connection = %descriptor.redacted(), "opening engine connection");

        let session = connector.connect(&descriptor).await.map_err(|e| {
            warn!(error = %e, data_source = %descriptor.data_source, "engine connection failed");
            ServiceError::Connection(e.to_string())
        })?;

        debug!(catalog = %descriptor.catalog, "engine connection opened");
        Ok(ManagedConnection {
            session: Some(session),
        })
    }
}

/// Exclusive handle to an open engine session.
pub struct ManagedConnection {
    session: Option<Box<dyn EngineSession>>,
}

impl ManagedConnection {
    /// Runs one statement on the session.
    pub async fn execute(&mut self, statement: &str) -> Result<Rowset, EngineError> {
        match self.session.as_mut() {
            Some(session) => session.execute(statement).await,
            None => Err(EngineError::SessionLost("connection is closed".into())),
        }
    }

    /// Ends the session. Failures are logged and swallowed.
    pub async fn close(mut self) {
        if let Some(session) = self.session.take() {
            close_session(session).await;
        }
    }
}

impl Drop for ManagedConnection {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("connection dropped without close; closing in background");
                handle.spawn(close_session(session));
            }
            Err(_) => warn!("connection dropped outside a runtime; session not closed"),
        }
    }
}

async fn close_session(mut session: Box<dyn EngineSession>) {
    match session.close().await {
        Ok(()) => debug!("engine connection closed"),
        Err(e) => warn!(error = %e, "engine connection close failed"),
    }
}
