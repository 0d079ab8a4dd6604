//! Error types for scenario generation
//!
//! Every fatal condition in the pipeline maps to one of four categories:
//! configuration problems, file I/O problems, internal invariant violations,
//! and bad or dangling references in the input data. Binaries translate any
//! of these into exit code 1 with the message on stderr.

use thiserror::Error;

/// Errors that can occur while loading data or generating scenarios
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A required config section or option is missing or malformed
    #[error("config error: {0}")]
    Config(String),

    /// A file could not be opened, read, or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON input file could not be parsed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal precondition was violated (e.g. path queried before the
    /// all-pairs cache was built, duplicate observation generator)
    #[error("invariant error: {0}")]
    Invariant(String),

    /// Input data references an unknown entity or carries an unknown tag
    #[error("data error: {0}")]
    Data(String),
}

impl ScenarioError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invariant error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Create a data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }
}

/// Result type used throughout the crate
pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ScenarioError::config("section `filepaths` not found");
        assert_eq!(e.to_string(), "config error: section `filepaths` not found");

        let e = ScenarioError::data("space 7 not found");
        assert_eq!(e.to_string(), "data error: space 7 not found");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: ScenarioError = io.into();
        assert!(matches!(e, ScenarioError::Io(_)));
    }
}
