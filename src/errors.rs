//! # Error Types Module
//!
//! Startup configuration failures are kept apart from per-call spreadsheet
//! failures: the former end the process before serving traffic, the latter
//! are reported to the user and classified as transient or terminal.

use std::path::PathBuf;

/// Fatal configuration errors raised while bootstrapping the bot
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Credentials file not found: {}", .0.display())]
    CredentialsFileMissing(PathBuf),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors returned by the spreadsheet client
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    /// Service-account file unreadable or malformed
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Token exchange rejected by the auth server
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Spreadsheet '{0}' not found or not shared with the service account")]
    SpreadsheetNotFound(String),

    #[error("Rate limited by the Sheets API")]
    RateLimited,

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SheetsError {
    /// Whether resending the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SheetsError::RateLimited | SheetsError::Http(_) => true,
            SheetsError::Api { status, .. } => *status >= 500,
            SheetsError::Credentials(_)
            | SheetsError::Auth(_)
            | SheetsError::SpreadsheetNotFound(_)
            | SheetsError::InvalidResponse(_) => false,
        }
    }
}
