//! Error types for codevet validation layers.
//!
//! Errors never cross the orchestrator boundary: every layer converts the
//! errors it encounters into a [`Verdict`](crate::core::Verdict). The types
//! here exist so that layers can use `?` internally and so that log lines
//! carry a stable category.
//!
//! # Categories
//!
//! - `Io`: file system operations (read, write, directory walk)
//! - `Parse`: malformed Python source
//! - `Config`: configuration file issues
//! - `Cache`: persisted cache records that cannot be read or written
//! - `Transport`: the remote inference endpoint failed or is unconfigured
//! - `Timeout`: the remote inference endpoint did not answer in time
//! - `Serialization`: JSON encoding/decoding failures

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for codevet operations.
#[derive(Debug, Error)]
pub enum CodevetError {
    /// File system I/O errors, optionally tied to a path
    #[error("I/O error{}: {source}", path_suffix(.path))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Source code that does not parse
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted cache records that cannot be used
    #[error("Cache error: {0}")]
    Cache(String),

    /// Remote inference endpoint failures
    #[error("Model transport error: {0}")]
    Transport(String),

    /// Remote inference endpoint did not answer within the deadline
    #[error("Model call timed out after {0} seconds")]
    Timeout(u64),

    /// JSON encoding/decoding failures
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CodevetError>;

/// Coarse classification used in structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parse,
    Config,
    Cache,
    Transport,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Io => "io",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Config => "config",
            ErrorCategory::Cache => "cache",
            ErrorCategory::Transport => "transport",
        };
        f.write_str(name)
    }
}

impl CodevetError {
    /// Create an I/O error tied to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodevetError::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Category of this error for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CodevetError::Io { .. } => ErrorCategory::Io,
            CodevetError::Parse { .. } => ErrorCategory::Parse,
            CodevetError::Config(_) => ErrorCategory::Config,
            CodevetError::Cache(_) | CodevetError::Serialization(_) => ErrorCategory::Cache,
            CodevetError::Transport(_) | CodevetError::Timeout(_) => ErrorCategory::Transport,
        }
    }

    /// Whether retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CodevetError::Timeout(_) | CodevetError::Transport(_)
        )
    }
}

impl From<std::io::Error> for CodevetError {
    fn from(source: std::io::Error) -> Self {
        CodevetError::Io { path: None, source }
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" for {}", p.display()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let err = CodevetError::io(
            "/tmp/missing.py",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.py"));
        assert!(msg.contains("not found"));
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_parse_error_display() {
        let err = CodevetError::Parse {
            message: "unexpected ':'".to_string(),
            line: 3,
            column: 7,
        };
        assert_eq!(
            err.to_string(),
            "Syntax error at line 3, column 7: unexpected ':'"
        );
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(CodevetError::Timeout(30).is_retryable());
        assert!(CodevetError::Transport("503".into()).is_retryable());
        assert!(!CodevetError::Config("bad".into()).is_retryable());
        assert_eq!(CodevetError::Timeout(1).category(), ErrorCategory::Transport);
    }
}
