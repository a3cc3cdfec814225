//! Response assembly: bridges service results to HTTP JSON responses.

use std::any::Any;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use xmla_service::types::BatchResult;

use crate::error::{ErrorBody, UNHANDLED_ERROR};
use crate::types::{ExecuteQueriesResponse, QueryResultBody};

const APPLICATION_JSON: &str = "application/json";

/// Serializes `body` as JSON with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T, pretty: bool) -> Response {
    let encoded = if pretty {
        serde_json::to_vec_pretty(body)
    } else {
        serde_json::to_vec(body)
    };
    match encoded {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, APPLICATION_JSON)], bytes).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, APPLICATION_JSON)],
                format!(r#"{{"error":"{UNHANDLED_ERROR}","detail":"response encoding failed"}}"#),
            )
                .into_response()
        }
    }
}

/// Status for a completed batch: 200 only when every query succeeded.
pub fn batch_status(result: &BatchResult) -> StatusCode {
    if result.all_succeeded() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Converts a batch result to its wire body.
pub fn batch_body(result: BatchResult) -> ExecuteQueriesResponse {
    ExecuteQueriesResponse {
        results: result
            .into_outcomes()
            .into_iter()
            .map(QueryResultBody::from)
            .collect(),
    }
}

/// Builds the full HTTP response for a batch.
pub fn batch_response(result: BatchResult, pretty: bool) -> Response {
    let status = batch_status(&result);
    json_response(status, &batch_body(result), pretty)
}

/// Empty JSON-typed response for methods other than POST.
pub async fn not_implemented() -> Response {
    (
        StatusCode::NOT_IMPLEMENTED,
        [(header::CONTENT_TYPE, APPLICATION_JSON)],
        Body::empty(),
    )
        .into_response()
}

/// Answers a handler panic with the unhandled-error body.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "request handler panicked".to_owned()
    };
    tracing::error!(%detail, "request handler panicked");
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorBody {
            error: UNHANDLED_ERROR.to_owned(),
            detail,
        },
        false,
    )
}
