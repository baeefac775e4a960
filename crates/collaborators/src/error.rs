//! Error types returned by collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a file transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The input could not be processed (bad glob, unreadable source, ...)
    #[error("malformed input {}: {message}", path.display())]
    MalformedInput { path: PathBuf, message: String },

    /// The external tool ran but reported failure
    #[error("transform '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("transform IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Failure of a version-control operation, carrying the tool's own message.
#[derive(Debug, Error)]
#[error("vcs {operation} failed: {message}")]
pub struct VcsError {
    pub operation: String,
    pub message: String,
}

impl VcsError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Failure of a file-transfer operation.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Credentials were required but not configured
    #[error("file transfer credentials missing: {0}")]
    MissingCredentials(String),

    #[error("transfer {operation} failed: {message}")]
    Operation { operation: String, message: String },
}

impl TransferError {
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Failure to start the live-reload server.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("live-reload server already started")]
    AlreadyStarted,

    #[error("live-reload server could not start: {0}")]
    Start(String),
}
