//! Error types for dirsubset
//!
//! Errors that abort a verification before any diagnostics exist live here.
//! Problems with individual files discovered during comparison are not
//! errors: they are folded into the report as [`DiffEntry`] values so a run
//! always completes with a best-effort verdict.
//!
//! [`DiffEntry`]: crate::compare::DiffEntry

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the dirsubset library
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Main error type for all dirsubset operations
#[derive(Debug, Error)]
pub enum VerifyError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A root path does not exist
    #[error("Path not found: {path:?}")]
    NotFound {
        /// The path that was supplied
        path: PathBuf,
    },

    /// A root path exists but is not a directory
    #[error("Not a directory: {path:?}")]
    NotADirectory {
        /// The path that was supplied
        path: PathBuf,
    },

    /// Exclude pattern could not be compiled
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as given by the caller
        pattern: String,
        /// Parser message
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rayon::ThreadPoolBuildError> for VerifyError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        VerifyError::ThreadPool(err.to_string())
    }
}

impl VerifyError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        VerifyError::Internal(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn configuration(msg: impl Into<String>) -> Self {
        VerifyError::InvalidConfiguration(msg.into())
    }

    /// Check if this error is about a supplied root rather than file content
    pub fn is_invalid_root(&self) -> bool {
        matches!(
            self,
            VerifyError::NotFound { .. } | VerifyError::NotADirectory { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            VerifyError::NotFound { path } => {
                format!("Path {:?} does not exist. Check the spelling or use an absolute path.", path)
            }
            VerifyError::NotADirectory { path } => {
                format!("Path {:?} is not a directory. Both inputs must be folders.", path)
            }
            VerifyError::InvalidPattern { pattern, reason } => {
                format!("Exclude pattern '{}' is not valid glob syntax ({}).", pattern, reason)
            }
            _ => self.to_string(),
        }
    }
}
