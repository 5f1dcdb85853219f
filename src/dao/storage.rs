use std::{error::Error, path::PathBuf};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by leaderboard storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("malformed leaderboard data: {0}")]
    Malformed(String),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Result alias for reference data loading.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Error raised while building one of the immutable reference directories.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV in `{path}`")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid JSON in `{path}`")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("alias `{alias}` maps to both `{first}` and `{second}`")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },
    #[error("invalid matrix in `{path}`: {message}")]
    Matrix { path: PathBuf, message: String },
    #[error("invalid problem definition: {0}")]
    Problem(String),
}
