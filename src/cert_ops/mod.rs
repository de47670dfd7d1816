//! Certificate file operations module
//!
//! Reads certificate chains from PEM and DER files for offline DANE checks.

pub mod reader;

pub use reader::{detect_format_from_bytes, read_certificate_chain, DetectedFormat};
