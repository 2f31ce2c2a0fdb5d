//! Error types for Runoff.
//!
//! Library crates use [`RunoffError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Runoff operations.
#[derive(Debug, thiserror::Error)]
pub enum RunoffError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A request or operation argument failed validation before any
    /// external tool was invoked.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The name allocator handed out a raster name it had already issued
    /// during the same run.
    #[error("raster name collision: {name}")]
    NameCollision { name: String },

    /// An external toolkit operation could not be launched or exited
    /// with a non-zero status. `status` is `None` when the process never
    /// ran or was terminated by a signal.
    #[error("toolkit operation `{operation}` failed: {diagnostic}")]
    Tool {
        operation: String,
        status: Option<i32>,
        diagnostic: String,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RunoffError>;

impl RunoffError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-argument error from any displayable message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    /// Wrap an external toolkit failure with its operation name, exit
    /// status, and captured diagnostic text.
    pub fn tool(operation: impl Into<String>, status: Option<i32>, diagnostic: impl Into<String>) -> Self {
        Self::Tool {
            operation: operation.into(),
            status,
            diagnostic: diagnostic.into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RunoffError::config("missing project path");
        assert_eq!(err.to_string(), "config error: missing project path");

        let err = RunoffError::invalid_argument("rainfall_rate must be > 0");
        assert!(err.to_string().contains("rainfall_rate"));
    }

    #[test]
    fn tool_error_carries_operation() {
        let err = RunoffError::tool("r.sim_water", Some(1), "ERROR: raster not found");
        assert!(err.to_string().contains("r.sim_water"));
        assert!(err.to_string().contains("raster not found"));
        match err {
            RunoffError::Tool { status, .. } => assert_eq!(status, Some(1)),
            _ => panic!("expected Tool"),
        }
    }
}
