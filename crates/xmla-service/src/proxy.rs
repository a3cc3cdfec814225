//! The request pipeline: validate, open, execute, close.
//!
//! Transports hand over raw header lookups and body bytes and receive a
//! [`BatchResult`] or a [`ServiceError`] to encode.

use std::any::Any;

use tracing::{error, info};

use crate::ServiceState;
use crate::connection::ConnectionManager;
use crate::error::ServiceError;
use crate::executor::BatchExecutor;
use crate::types::{BatchResult, ConnectionCoordinates, QueryBatchRequest};
use crate::validate;

/// Stateless method collection; all state is borrowed from `ServiceState`.
pub struct ProxyService;

impl ProxyService {
    /// Validates a raw request and runs it.
    pub async fn handle<'a, F>(
        state: &ServiceState,
        header: F,
        body: &[u8],
    ) -> Result<BatchResult, ServiceError>
    where
        F: Fn(&'static str) -> Option<&'a [u8]>,
    {
        let validated = validate::coordinates_from_headers(header)
            .and_then(|coords| validate::parse_batch(body).map(|batch| (coords, batch)));
        let (coordinates, batch) = match validated {
            Ok(v) => v,
            Err(e) => {
                state.metrics().record_validation_error();
                return Err(e.into());
            }
        };

        Self::execute(state, coordinates, batch).await
    }

    /// Runs an already validated batch on a fresh connection.
    ///
    /// The connection is closed before this returns, including when the
    /// executor panics.
    pub async fn execute(
        state: &ServiceState,
        coordinates: ConnectionCoordinates,
        batch: QueryBatchRequest,
    ) -> Result<BatchResult, ServiceError> {
        let mut conn = match ConnectionManager::open(
            state.connector(),
            coordinates,
            &batch.impersonated_user_name,
        )
        .await
        {
            Ok(conn) => conn,
            Err(e) => {
                state.metrics().record_connection_error();
                return Err(e);
            }
        };

        let task_state = state.clone();
        let handle = tokio::spawn(async move {
            let result = BatchExecutor::run(&mut conn, &batch, task_state.metrics()).await;
            conn.close().await;
            result
        });

        let result = handle.await.map_err(|e| {
            state.metrics().record_internal_error();
            let detail = if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                e.to_string()
            };
            error!(%detail, "batch execution aborted");
            ServiceError::Internal(detail)
        })?;

        state.metrics().record_batch(result.all_succeeded());
        info!(
            queries = result.len(),
            all_succeeded = result.all_succeeded(),
            "batch executed"
        );
        Ok(result)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "batch execution panicked".to_owned(), |s| (*s).to_owned()),
    }
}
