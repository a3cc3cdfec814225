//! XMLA HTTP: REST transport adapter for the XMLA query proxy.
//!
//! Provides the HTTP interface including:
//! - the `executeQueries`-compatible batch endpoint (on `/` and `/executeQueries`)
//! - health and Prometheus metrics endpoints
//! - OpenAPI/Swagger UI
//! - request-ID, CORS, body-limit and panic-catching middleware

pub mod encode;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use xmla_service::validate::REQUIRED_HEADERS;

use error::ErrorBody;

pub use state::AppState;

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    info(
        title = "XMLA Query Proxy API",
        description = "Runs batches of DAX queries against Power BI / Analysis Services XMLA endpoints.\n\nConnection details travel in `x-pbi-*` headers; each request opens one connection, runs its queries in order and closes the connection before responding.",
        version = "0.3.0",
        license(name = "Apache-2.0"),
    ),
    paths(
        routes::execute::execute_queries,
        routes::system::health,
    ),
    components(
        schemas(
            xmla_service::types::QueryBatchRequest, xmla_service::types::QueryItem,
            xmla_service::types::SerializerSettings, xmla_service::types::ImpersonationIdentity,
            types::ExecuteQueriesResponse, types::QueryResultBody, types::TableBody,
            types::QueryErrorBody, types::HealthResponse, ErrorBody,
        )
    ),
    tags(
        (name = "Query", description = "Execute DAX query batches"),
        (name = "System", description = "System and health endpoints"),
    )
)]
struct ApiDoc;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the HTTP API router.
///
/// Any method other than POST on the batch paths answers 501.
pub fn router(state: AppState) -> Router {
    let execute = || post(routes::execute::execute_queries).fallback(encode::not_implemented);

    let api = Router::new()
        .route("/", execute())
        .route("/executeQueries", execute())
        // System
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics_endpoint))
        .layer(DefaultBodyLimit::max(state.max_body_bytes()))
        .layer(CatchPanicLayer::custom(encode::panic_response))
        .layer(TraceLayer::new_for_http());

    let api = api
        .layer(axum::middleware::from_fn(
            middleware::request_id::request_id_middleware,
        ))
        .layer(cors_layer(&state))
        .with_state(state);

    api.merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}

/// Serve the HTTP router on the given listener with graceful shutdown.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.cors_origins();

    // No origins configured → no CORS headers (deny cross-origin by default).
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let x_request_id = middleware::request_id::X_REQUEST_ID.clone();
    let mut allowed = vec![axum::http::header::CONTENT_TYPE, x_request_id.clone()];
    allowed.extend(REQUIRED_HEADERS.iter().map(|&h| HeaderName::from_static(h)));

    let base = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers(allowed)
        .expose_headers([x_request_id]);

    if origins.len() == 1 && origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard origin, all cross-origin requests allowed");
        base.allow_origin(tower_http::cors::Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        base.allow_origin(parsed)
    }
}
