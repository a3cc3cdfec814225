//! Transport-agnostic types shared across the service layer.
//!
//! No HTTP dependencies. The HTTP crate wraps these in its own wire types
//! when it assembles a response.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single result row: column name to value, in schema order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Per-request coordinates of the remote analytical endpoint.
///
/// Built from request headers, consumed once to build a
/// [`ConnectionDescriptor`](crate::engine::ConnectionDescriptor), then dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionCoordinates {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: String,
    pub dataset: String,
}

impl fmt::Debug for ConnectionCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCoordinates")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("dataset", &self.dataset)
            .finish()
    }
}

/// User whose effective permissions the queries run under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct ImpersonationIdentity(String);

impl ImpersonationIdentity {
    /// Wraps an already-validated identity.
    pub(crate) fn new(user: String) -> Self {
        Self(user)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImpersonationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One query of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueryItem {
    /// DAX query text.
    pub query: String,
}

/// Row serialization options, as accepted by the executeQueries API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SerializerSettings {
    /// Keep columns whose value is null. When false they are left out of the row.
    #[serde(default = "default_include_nulls")]
    pub include_nulls: bool,
}

fn default_include_nulls() -> bool {
    true
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            include_nulls: default_include_nulls(),
        }
    }
}

/// A validated batch of queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct QueryBatchRequest {
    /// Queries to run, in order. Never empty.
    pub queries: Vec<QueryItem>,
    /// User to impersonate (email address).
    pub impersonated_user_name: ImpersonationIdentity,
    /// Row serialization options.
    #[serde(default)]
    pub serializer_settings: SerializerSettings,
}

/// Classification of a failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    /// The engine evaluated the query and reported a structured error.
    ModelQueryExecution,
    /// The client protocol failed (transport, decoding, lost session).
    EngineClient,
}

impl FailureCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelQueryExecution => "ModelQueryExecutionError",
            Self::EngineClient => "EngineClientError",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one query item.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success { rows: Vec<Row> },
    Failure { code: FailureCode, message: String },
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Outcomes of a whole batch, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    outcomes: Vec<QueryOutcome>,
    all_succeeded: bool,
}

impl BatchResult {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(n),
            all_succeeded: true,
        }
    }

    pub(crate) fn push(&mut self, outcome: QueryOutcome) {
        self.all_succeeded &= outcome.is_success();
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[QueryOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<QueryOutcome> {
        self.outcomes
    }

    /// True iff every outcome is a success.
    pub fn all_succeeded(&self) -> bool {
        self.all_succeeded
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl FromIterator<QueryOutcome> for BatchResult {
    fn from_iter<I: IntoIterator<Item = QueryOutcome>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut result = Self::with_capacity(iter.size_hint().0);
        for outcome in iter {
            result.push(outcome);
        }
        result
    }
}
