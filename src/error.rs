//! Unified error type for trace parsing, graph, and suggestion operations.
//!
//! Errors carry a one-line message and an optional detail string; they do
//! not carry stack traces (§7 of the design notes). Exit-code assignment is
//! left to whatever CLI a host application builds on top of this crate.

use std::path::PathBuf;

/// Errors produced anywhere in the `bha` pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A file or path that should exist does not.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        detail: Option<String>,
    },

    /// Trace content could not be decoded by the parser that claimed it.
    #[error("parse error: {message}")]
    ParseError {
        message: String,
        detail: Option<String>,
    },

    /// A caller-supplied parameter was invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
        detail: Option<String>,
    },

    /// A filesystem or system-call failure.
    #[error("io error: {message}")]
    IoError {
        message: String,
        detail: Option<String>,
    },

    /// An invariant was violated that should not be reachable.
    #[error("internal error: {message}")]
    InternalError {
        message: String,
        detail: Option<String>,
    },
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            detail: None,
        }
    }

    pub fn not_found_path(message: impl Into<String>, path: &std::path::Path) -> Self {
        Error::NotFound {
            message: message.into(),
            detail: Some(path.display().to_string()),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::ParseError {
            message: message.into(),
            detail: None,
        }
    }

    pub fn parse_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::ParseError {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::InternalError {
            message: message.into(),
            detail: None,
        }
    }

    /// One-line, user-visible message (no stack trace).
    pub fn message(&self) -> &str {
        match self {
            Error::NotFound { message, .. }
            | Error::ParseError { message, .. }
            | Error::InvalidArgument { message, .. }
            | Error::IoError { message, .. }
            | Error::InternalError { message, .. } => message,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::NotFound { detail, .. }
            | Error::ParseError { detail, .. }
            | Error::InvalidArgument { detail, .. }
            | Error::IoError { detail, .. }
            | Error::InternalError { detail, .. } => detail.as_deref(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError {
            message: err.to_string(),
            detail: None,
        }
    }
}

/// Helper used by parsers reading a file path that turns a missing-file
/// `io::Error` into `Error::NotFound` rather than a generic `IoError`,
/// matching §7's rule that registry misses and missing files surface as
/// `NotFound`.
pub fn io_error_for_path(err: std::io::Error, path: &PathBuf) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::not_found_path("file not found", path)
    } else {
        Error::IoError {
            message: err.to_string(),
            detail: Some(path.display().to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
