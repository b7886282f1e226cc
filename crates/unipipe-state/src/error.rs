//! Error types for the UniPipe instance repository.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for repository operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing the repository.
///
/// A missing record is not an error; lookups report absence through
/// `Option`, the default status, or an empty list.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("failed to decode {path}: {message}")]
    Deserialize { path: PathBuf, message: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("unknown metric type: {0}")]
    InvalidMetricType(String),
}

/// Convert an `std::io::Error` into a `StateError::Io` naming the path.
macro_rules! io_err {
    ($path:expr) => {
        |e| $crate::error::StateError::io($path, e)
    };
}

pub(crate) use io_err;

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<git2::Error> for StateError {
    fn from(e: git2::Error) -> Self {
        StateError::Git(e.message().to_string())
    }
}
