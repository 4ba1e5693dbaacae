//! Unified error types for the scraper

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Unified error type for all scraper operations
#[derive(Error, Debug)]
pub enum NutriError {
    // Discovery errors
    #[error("No compatible browser found on this system")]
    NoCompatibleBrowser,

    #[error("Browser {0} not found on this system")]
    BrowserNotFound(String),

    #[error("Unsupported browser type: {0}")]
    UnknownBrowser(String),

    #[error("Failed to set up the driver for {browser}: {message}")]
    SessionStart { browser: String, message: String },

    #[error("Driver resolution failed: {0}")]
    DriverResolution(String),

    // Page errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    // Data errors
    #[error("URL file not found at {0}; run the URL collection first")]
    UrlFileMissing(PathBuf),

    #[error("Invalid URL record: {0}")]
    InvalidRecord(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Interrupted by user")]
    Interrupted,

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl NutriError {
    /// Build a session-start error for the given browser
    pub fn session_start(browser: impl ToString, message: impl ToString) -> Self {
        Self::SessionStart {
            browser: browser.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias using NutriError
pub type Result<T> = std::result::Result<T, NutriError>;
