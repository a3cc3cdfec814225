//! HTTP middleware: request ID tracking.

pub mod request_id;
