//! Error types for cloudview

use std::path::Path;
use thiserror::Error;

/// Main error type for cloudview operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Display environment error: {0}")]
    Environment(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], used for exit reporting and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileNotFound,
    Parse,
    Environment,
    Io,
}

impl Error {
    /// Build a `FileNotFound` error for `path`
    pub fn file_not_found(path: &Path) -> Self {
        Error::FileNotFound {
            path: path.display().to_string(),
        }
    }

    /// Build a `Parse` error from anything printable
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    /// Build an `Environment` error from anything printable
    pub fn environment(message: impl Into<String>) -> Self {
        Error::Environment(message.into())
    }

    /// Classify this error.
    ///
    /// An unrecognized format is reported as a parse failure, and GPU setup
    /// failures as an unusable display environment.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileNotFound { .. } => ErrorKind::FileNotFound,
            Error::Parse(_) | Error::UnsupportedFormat(_) => ErrorKind::Parse,
            Error::Environment(_) | Error::Gpu(_) => ErrorKind::Environment,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for cloudview operations
pub type Result<T> = std::result::Result<T, Error>;
