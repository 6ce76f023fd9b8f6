//! Service layer for business logic.
//!
//! Services sit between the HTTP/CLI front ends and the OCR backends.

pub mod scan;

pub use scan::{ScanError, ScanOutput, ScanService};
