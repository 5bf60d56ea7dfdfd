//! Error types for UDF execution
//!
//! Every failure is fatal for the invocation: nothing here is retried, and
//! the host execution context surfaces the error to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while running a UDF invocation
#[derive(Debug, Error)]
pub enum UdfError {
    /// Connection name unknown to the engine, or its address is unusable
    #[error("Cannot resolve connection '{name}': {reason}")]
    ConnectionResolution {
        /// Connection name as given in the input row
        name: String,
        /// Why resolution failed
        reason: String,
    },

    /// Cached model missing or unreadable at the resolved path
    #[error("Failed to load model '{model}' from {}: {reason}", path.display())]
    ModelLoad {
        /// Model name
        model: String,
        /// Local cache directory that was searched
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// Pipeline output does not match the shape expected for the input
    #[error("Unexpected prediction shape: {0}")]
    PredictionShape(String),

    /// Out of memory while loading or moving a model to a device
    #[error("Device memory exhausted on {device}: {reason}")]
    DeviceMemory {
        /// Device the allocation was attempted on
        device: String,
        /// Backend message
        reason: String,
    },

    /// Tokenizer lacks a required token or could not be parsed
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Input cell missing or of the wrong type
    #[error("Invalid value in column '{column}': {reason}")]
    Column {
        /// Column name
        column: &'static str,
        /// What was wrong with the value
        reason: String,
    },

    /// Host execution context failed to deliver or accept rows
    #[error("Execution context error: {0}")]
    Context(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UdfError {
    /// Shorthand for a connection that is not known to the resolver
    pub fn unknown_connection(name: &str) -> Self {
        UdfError::ConnectionResolution {
            name: name.to_string(),
            reason: "no such connection".to_string(),
        }
    }

    /// Shorthand for a column decoding failure
    pub fn column(column: &'static str, reason: impl Into<String>) -> Self {
        UdfError::Column {
            column,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, UdfError>;
