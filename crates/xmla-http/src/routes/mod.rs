//! HTTP API route handlers.

pub mod execute;
pub mod system;
