//! Batch execution endpoint, compatible with the Power BI `executeQueries`
//! request and response shapes.
//!
//! Delegates to `xmla_service::proxy::ProxyService`.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::response::Response;

use xmla_service::proxy::ProxyService;
use xmla_service::validate;

use crate::encode;
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;
use crate::types::ExecuteQueriesResponse;

/// Execute a batch of DAX queries against an XMLA endpoint.
///
/// Queries run sequentially on one connection opened for the request and
/// closed before the response is sent. The response is 200 only when every
/// query succeeded; otherwise 400 with per-query errors in place.
#[utoipa::path(
    post,
    path = "/executeQueries",
    params(
        ("x-pbi-tenant-id" = String, Header, description = "Azure AD tenant"),
        ("x-pbi-client-id" = String, Header, description = "Service principal application id"),
        ("x-pbi-client-secret" = String, Header, description = "Service principal secret"),
        ("x-pbi-xmla-endpoint" = String, Header, description = "XMLA data source address"),
        ("x-pbi-dataset-name" = String, Header, description = "Dataset (catalog) name"),
    ),
    request_body = xmla_service::types::QueryBatchRequest,
    responses(
        (status = 200, description = "All queries succeeded", body = ExecuteQueriesResponse),
        (status = 400, description = "Invalid request or at least one query failed", body = ExecuteQueriesResponse),
        (status = 500, description = "Connection failure or unexpected error", body = ErrorBody),
        (status = 501, description = "Method other than POST"),
    ),
    tag = "Query"
)]
pub async fn execute_queries(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let pretty = state.pretty_json();
    let header = |name: &'static str| headers.get(name).map(|v| v.as_bytes());

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            // Header problems are reported before body problems.
            state.metrics().record_validation_error();
            let err = match validate::coordinates_from_headers(header) {
                Err(e) => ApiError::Validation(e),
                Ok(_) => ApiError::Body {
                    status: rejection.status(),
                    detail: rejection.body_text(),
                },
            };
            return err.to_response(pretty);
        }
    };

    match ProxyService::handle(&state, header, &body).await {
        Ok(result) => encode::batch_response(result, pretty),
        Err(e) => ApiError::from(e).to_response(pretty),
    }
}
