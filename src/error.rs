//! Error types for costtree
//!
//! This module defines the error types used throughout the costtree library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! # Example
//!
//! ```
//! use costtree::error::{CosttreeError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to CosttreeError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Main error type for costtree operations
///
/// This enum encompasses all possible errors that can occur during a run,
/// from configuration validation to warehouse queries and filesystem output.
#[derive(Error, Debug)]
pub enum CosttreeError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error (missing or invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// BigQuery rejected or failed the query
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
}

/// Convenience type alias for Results in costtree
///
/// # Example
///
/// ```
/// use costtree::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, CosttreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CosttreeError::Config("missing GCP_BILLING_PROJECT_ID".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: missing GCP_BILLING_PROJECT_ID"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let costtree_error: CosttreeError = io_error.into();
        assert!(matches!(costtree_error, CosttreeError::Io(_)));
    }
}
