use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures reading or writing the saved states file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read saved states from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("saved states file {path} is not a valid catalog: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize saved states: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write saved states to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("saved states write timed out after {0:?}")]
    Timeout(Duration),

    #[error("saved states write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
