//! Error types for opening sources.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when opening an input source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for the connection.
    #[error("Connection timed out")]
    Timeout,

    /// A local file could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_connect() {
            SourceError::Connection(err.to_string())
        } else {
            SourceError::Http(err.to_string())
        }
    }
}
