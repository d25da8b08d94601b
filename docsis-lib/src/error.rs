use std::io;
use thiserror::Error;

/// The primary error type for the `docsis-lib` library.
///
/// Protocol-level problems inside a frame (bad checksums, malformed lengths,
/// broken extended headers) are not errors: they are reported as expert infos
/// on the field sink and dissection carries on. This type covers the cases
/// where there is nothing left to dissect.
#[derive(Error, Debug)]
pub enum DocsisError {
    #[error("Insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Capture file error: {0}")]
    Capture(String),

    #[error("Unsupported link type {0} (expected DOCSIS, 143)")]
    UnsupportedLinkType(i32),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
