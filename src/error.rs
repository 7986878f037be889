// src/error.rs

//! Unified error handling for the newsdesk core.

use std::fmt;

use thiserror::Error;

/// Result type alias for newsdesk operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied missing or malformed required input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Upstream provider rejected our credentials (HTTP 401)
    #[error("Invalid API key. Please verify your NEWS_API_KEY.")]
    Auth,

    /// Upstream provider returned an unexpected status or malformed body
    #[error("Failed to fetch {context}: {message}")]
    Upstream { context: String, message: String },

    /// Orchestration-level wrapper, preserves the original message
    #[error("Refresh failed during {context}: {message}")]
    Refresh { context: String, message: String },

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an upstream error with request context.
    pub fn upstream(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Upstream {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a refresh error with operation context.
    pub fn refresh(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Refresh {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error is a client-input problem rather than a system fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
