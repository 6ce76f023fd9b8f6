//! HTTP request handlers for the web server.

mod api;
mod types;

// Re-export handlers for use by the router
pub use api::{root, scan};
pub use types::{ErrorResponse, ScanResponse, StatusResponse};
