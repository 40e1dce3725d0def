//! Error types for catenate.
//!
//! Library crates use [`CatenateError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all catenate operations.
#[derive(Debug, thiserror::Error)]
pub enum CatenateError {
    /// Invalid construction arguments or settings.
    #[error("config error: {message}")]
    Config { message: String },

    /// Ingestion attempted before a template was loaded.
    #[error("collector not initialized: {message}")]
    NotInitialized { message: String },

    /// A path expression that must select exactly `expected` nodes did not.
    #[error("the path <{expr}> selects an invalid number of elements (expected {expected}, found {actual})")]
    InvalidSelection {
        expr: String,
        expected: usize,
        actual: usize,
    },

    /// Operation not allowed in the collector's current lifecycle state.
    #[error("invalid collector state: {message}")]
    State { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed XML input.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Malformed or unresolvable path expression.
    #[error("path expression <{expr}>: {message}")]
    Path { expr: String, message: String },

    /// Tree-to-text serialization failure.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// A file read did not complete within the configured timeout.
    #[error("read of {path:?} timed out after {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },

    /// A background read task panicked or was aborted.
    #[error("task error: {0}")]
    Task(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CatenateError>;

impl CatenateError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a not-initialized error from any displayable message.
    pub fn not_initialized(msg: impl Into<String>) -> Self {
        Self::NotInitialized {
            message: msg.into(),
        }
    }

    /// Create a lifecycle state error from any displayable message.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a path expression error for `expr`.
    pub fn path(expr: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Path {
            expr: expr.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
