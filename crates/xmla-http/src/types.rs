//! Response types for the executeQueries-compatible API.

use serde::Serialize;
use utoipa::ToSchema;
use xmla_service::types::{QueryOutcome, Row};

/// Body of a batch response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecuteQueriesResponse {
    /// One entry per requested query, in request order.
    pub results: Vec<QueryResultBody>,
}

/// Result of one query: a table set or an error.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum QueryResultBody {
    Tables { tables: Vec<TableBody> },
    Error { error: QueryErrorBody },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TableBody {
    /// Rows keyed by column name, in schema order.
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryErrorBody {
    /// "ModelQueryExecutionError" or "EngineClientError".
    pub code: String,
    /// Error text reported by the engine or client.
    pub message: String,
}

impl From<QueryOutcome> for QueryResultBody {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Success { rows } => Self::Tables {
                tables: vec![TableBody { rows }],
            },
            QueryOutcome::Failure { code, message } => Self::Error {
                error: QueryErrorBody {
                    code: code.as_str().to_owned(),
                    message,
                },
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server status ("ok").
    pub status: String,
    /// Server version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}
