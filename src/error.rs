//! Error types for Askdoc
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Askdoc operations
///
/// This enum encompasses all possible errors that can occur while talking
/// to the chat backend: configuration loading, authentication, REST calls,
/// stream handling, and credential storage.
#[derive(Error, Debug)]
pub enum AskdocError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend API errors (unexpected status codes, bad payloads)
    #[error("API error: {0}")]
    Api(String),

    /// Authentication errors (e.g., 401 Unauthorized, missing token)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The requested resource does not exist (or no longer exists)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Answer stream errors (connection drop, idle timeout)
    #[error("Stream error: {0}")]
    Stream(String),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Askdoc operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
