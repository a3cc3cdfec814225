//! XMLA proxy - serves `executeQueries`-style DAX batches over XMLA.
//!
//! The request pipeline lives in `xmla-service`, the XMLA/HTTP engine
//! client in `xmla-client` and the REST transport in `xmla-http`. This
//! crate wires them together from a [`config::Config`].

pub mod config;

use std::sync::Arc;

use xmla_client::{XmlaConnector, XmlaError};
use xmla_service::ServiceState;
use xmla_service::engine::Connector;

pub use xmla_http::{AppState, router};

/// Builds the application state around an arbitrary engine connector.
pub fn app_state(config: &config::Config, connector: Arc<dyn Connector>) -> AppState {
    AppState::new(
        ServiceState::new(connector),
        config.cors_origins.clone(),
        config.pretty_json,
        config.max_body_bytes,
    )
}

/// Builds the application state with the XMLA connector.
pub fn build_state(config: &config::Config) -> Result<AppState, XmlaError> {
    let connector = XmlaConnector::new()?;
    Ok(app_state(config, Arc::new(connector)))
}
