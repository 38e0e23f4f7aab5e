//! Error types for the blobscan library.
//!
//! Scan operations convert almost every failure into a failure
//! [`ScanResult`](crate::core::ScanResult) envelope. The variants of
//! [`ScanError`] still exist so each layer can return a typed `Result`
//! and the session decides which failures become envelopes and which
//! abort the call.

use thiserror::Error;

/// The main error type for scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The session has no open backend handle.
    #[error("scanner session is not connected")]
    NotConnected,

    /// Local file path does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The backend answered with a non-success HTTP status.
    #[error("Scan failed with status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body text, as returned.
        body: String,
    },

    /// The request could not be delivered or the channel call failed.
    #[error("{message}")]
    Transport {
        /// Underlying transport message.
        message: String,
    },

    /// The backend response could not be interpreted.
    #[error("Failed to parse scan results: {message}")]
    Parse {
        /// What went wrong while parsing.
        message: String,
    },

    /// Releasing the backend handle failed.
    #[error("Error closing scanner handle: {message}")]
    SessionClose {
        /// Underlying close failure.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Returns `true` if the error must abort the call instead of being
    /// reported inside a failure envelope.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::NotConnected)
    }

    /// Returns `true` if a caller could reasonably retry the scan.
    ///
    /// The core itself never retries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `Transport` error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a `Parse` error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a `FileNotFound` error for a path.
    pub fn file_not_found(path: &std::path::Path) -> Self {
        Self::FileNotFound {
            path: path.display().to_string(),
        }
    }

    /// Maps an I/O error on `path`, turning `NotFound` into `FileNotFound`.
    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::file_not_found(path)
        } else {
            Self::Io(err)
        }
    }
}

/// Error type for blob collaborator operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The blob URL does not have the expected shape.
    #[error("invalid blob url '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Writing metadata or tags failed.
    #[error("failed to write {target} for blob '{blob}': {reason}")]
    WriteFailed {
        /// "metadata" or "tags".
        target: &'static str,
        /// Blob name.
        blob: String,
        /// Reason for the failure.
        reason: String,
    },
}
