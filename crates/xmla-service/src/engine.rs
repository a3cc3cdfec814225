//! The analytical-engine capability consumed by the pipeline.
//!
//! The service never speaks a wire protocol itself. A [`Connector`] opens an
//! [`EngineSession`]; the session runs query text and returns a [`Rowset`].
//! `xmla-client` provides the XMLA implementation.

use std::fmt;

use crate::types::{ConnectionCoordinates, ImpersonationIdentity};

/// Everything the engine client needs to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Endpoint URL as supplied by the caller.
    pub data_source: String,
    /// Application identity, `app:{client_id}@{tenant_id}`.
    pub user_id: String,
    /// Client secret.
    pub password: String,
    /// Dataset (catalog) to query.
    pub catalog: String,
    /// User whose permissions apply to every query.
    pub effective_user_name: String,
}

impl ConnectionDescriptor {
    pub fn new(coordinates: ConnectionCoordinates, identity: &ImpersonationIdentity) -> Self {
        let ConnectionCoordinates {
            tenant_id,
            client_id,
            client_secret,
            endpoint,
            dataset,
        } = coordinates;
        Self {
            data_source: endpoint,
            user_id: format!("app:{client_id}@{tenant_id}"),
            password: client_secret,
            catalog: dataset,
            effective_user_name: identity.as_str().to_owned(),
        }
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted(&self) -> String {
        format!(
            "Data Source={};User ID={};Password=***;Catalog={};EffectiveUserName={}",
            self.data_source, self.user_id, self.catalog, self.effective_user_name
        )
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Tabular query result: column names in schema order, and rows whose
/// values line up with those columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rowset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Failure reported by an engine client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine evaluated the request and returned a structured error.
    #[error("{message}")]
    Engine {
        code: Option<String>,
        message: String,
    },

    /// The client protocol failed: transport, HTTP status, or decoding.
    #[error("{0}")]
    Client(String),

    /// The session is no longer usable. Nothing further can run on it.
    #[error("{0}")]
    SessionLost(String),
}

/// Opens sessions against a remote engine.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Performs the handshake and returns a live session.
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// A live, single-owner session. Not safe for concurrent queries.
#[async_trait::async_trait]
pub trait EngineSession: Send + 'static {
    /// Runs `statement` to completion and returns all of its rows.
    async fn execute(&mut self, statement: &str) -> Result<Rowset, EngineError>;

    /// Ends the session on the remote side.
    async fn close(&mut self) -> Result<(), EngineError>;
}
