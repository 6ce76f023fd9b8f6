//! OCR service - extracts text from uploaded images over HTTP.
//!
//! A single `POST /scan` endpoint accepts a multipart image upload, runs it
//! through the OCR backend loaded at startup and returns the recognized
//! lines joined with newlines.

pub mod cli;
pub mod config;
pub mod ocr;
pub mod server;
pub mod services;
pub mod storage;
