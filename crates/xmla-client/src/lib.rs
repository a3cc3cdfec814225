//! XMLA Client: the analytical-engine client used by the proxy.
//!
//! Speaks XMLA over HTTP: SOAP `Execute` requests carrying the statement and
//! the `Catalog`/`EffectiveUserName` properties, with a server-side session
//! opened by `BeginSession` and released by `EndSession`. Credentials travel
//! as HTTP Basic (`app:{client}@{tenant}` and the client secret); the
//! endpoint performs its own token exchange.

mod connector;
pub mod endpoint;
mod envelope;
pub mod error;
mod response;

pub use connector::XmlaConnector;
pub use error::XmlaError;
