//! Custom error types for rustpubmed.
//!
//! This module defines all error types used throughout the pipeline.
//! All functions return `Result<T, PubmedError>` instead of using `unwrap()`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rustpubmed operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum PubmedError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned a non-success status or an error payload
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code (or 0 when the API reported the error in-band)
        code: i32,
        /// Error message from API
        message: String,
    },

    /// XML/response parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Output file could not be created or written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Attempted output path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error (missing credential, bad URL, ...)
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl PubmedError {
    /// True for failures of an HTTP exchange (transport or status).
    pub fn is_request(&self) -> bool {
        matches!(self, PubmedError::Network(_) | PubmedError::Api { .. })
    }
}

/// Result type alias using `PubmedError`
pub type Result<T> = std::result::Result<T, PubmedError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PubmedError::Parse(msg.to_string()))
    }
}
