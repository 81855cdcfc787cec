use std::path::PathBuf;
use thiserror::Error;

/// Core error type for loading and validating the dependency graph snapshot.
///
/// Resolution failures use [`crate::resolver::ResolveError`] instead; this
/// type only covers getting the tables into memory.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read dependency graph at {path}: {source}")]
    GraphRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dependency graph at {path}: {source}")]
    GraphParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dependency graph at {path} has schema version {found}, expected {expected}")]
    GraphVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("No dependency graph snapshot found from {start}")]
    GraphNotFound { start: PathBuf },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
