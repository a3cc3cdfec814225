//! Sequential batch execution over one connection.

use std::time::Instant;

use tracing::{debug, warn};

use crate::connection::ManagedConnection;
use crate::engine::{EngineError, Rowset};
use crate::metrics::Metrics;
use crate::types::{BatchResult, FailureCode, QueryBatchRequest, QueryOutcome, Row};

/// Runs every query of a batch, in order, and collects one outcome each.
pub struct BatchExecutor;

impl BatchExecutor {
    /// Executes `batch` on `conn`.
    ///
    /// A failing query never stops the batch. If the session is lost, the
    /// failing query and every query after it get the same failure and
    /// nothing more is sent to the engine.
    pub async fn run(
        conn: &mut ManagedConnection,
        batch: &QueryBatchRequest,
        metrics: &Metrics,
    ) -> BatchResult {
        let include_nulls = batch.serializer_settings.include_nulls;
        let mut result = BatchResult::with_capacity(batch.queries.len());
        let mut lost: Option<String> = None;

        for (idx, item) in batch.queries.iter().enumerate() {
            if let Some(message) = &lost {
                metrics.record_query_error(FailureCode::EngineClient);
                result.push(QueryOutcome::Failure {
                    code: FailureCode::EngineClient,
                    message: message.clone(),
                });
                continue;
            }

            let started = Instant::now();
            let outcome = match conn.execute(&item.query).await {
                Ok(rowset) => {
                    let rows = rows_from(rowset, include_nulls);
                    debug!(index = idx, rows = rows.len(), "query succeeded");
                    metrics.record_query(started.elapsed().as_micros() as u64);
                    QueryOutcome::Success { rows }
                }
                Err(err) => {
                    let code = classify(&err);
                    warn!(index = idx, %code, error = %err, "query failed");
                    metrics.record_query_error(code);
                    if let EngineError::SessionLost(message) = &err {
                        lost = Some(message.clone());
                    }
                    QueryOutcome::Failure {
                        code,
                        message: err.to_string(),
                    }
                }
            };
            result.push(outcome);
        }

        result
    }
}

fn classify(err: &EngineError) -> FailureCode {
    match err {
        EngineError::Engine { .. } => FailureCode::ModelQueryExecution,
        EngineError::Client(_) | EngineError::SessionLost(_) => FailureCode::EngineClient,
    }
}

/// Pairs each value with its column name, keeping schema order.
fn rows_from(rowset: Rowset, include_nulls: bool) -> Vec<Row> {
    let Rowset { columns, rows } = rowset;
    rows.into_iter()
        .map(|values| {
            let mut values = values.into_iter();
            columns
                .iter()
                .map(|col| (col.clone(), values.next().unwrap_or(serde_json::Value::Null)))
                .filter(|(_, v)| include_nulls || !v.is_null())
                .collect()
        })
        .collect()
}
