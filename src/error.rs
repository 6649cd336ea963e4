//! Error types for the bank support service

use std::time::Duration;
use thiserror::Error;

/// Result type alias for support operations
pub type Result<T> = std::result::Result<T, SupportError>;

#[derive(Error, Debug)]
pub enum SupportError {

    // =============================
    // Request Errors
    // =============================

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =============================
    // Provider Errors
    // =============================

    #[error("Provider request failed: {0}")]
    ProviderError(String),

    #[error("Provider returned {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Model did not finish within {0} round trips")]
    ToolLoopExceeded(usize),

    // =============================
    // Startup Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
