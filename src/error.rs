//! Centralized error types for inbox2html.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the inbox2html library.
#[derive(Error, Debug)]
pub enum Inbox2HtmlError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mail server could not be reached, or the connection dropped.
    #[error("Connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    /// The server rejected the credentials.
    #[error("Authentication failed for '{user}': {reason}")]
    Authentication { user: String, reason: String },

    /// The server answered with an IMAP-level error (NO/BAD/parse failure).
    #[error("IMAP protocol error during {operation}: {reason}")]
    Protocol { operation: String, reason: String },

    /// The message index file does not exist.
    #[error("Message index not found: {0}")]
    IndexMissing(PathBuf),

    /// The message index file exists but is not a JSON object of strings.
    #[error("Malformed message index '{path}': {reason}")]
    InvalidIndex { path: PathBuf, reason: String },

    /// A MIME decoding error.
    #[error("MIME decoding error: {0}")]
    MimeError(String),

    /// A required configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, Inbox2HtmlError>`.
pub type Result<T> = std::result::Result<T, Inbox2HtmlError>;

impl Inbox2HtmlError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Protocol` variant for the named IMAP operation.
    pub fn protocol(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Protocol {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `Inbox2HtmlError::io`).
impl From<std::io::Error> for Inbox2HtmlError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
