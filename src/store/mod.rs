//! File-backed persistence: the last-known state snapshot and per-target diff history.
use std::path::PathBuf;
use thiserror::Error;

pub mod diff_store;
pub mod line_diff;
pub mod models;
pub mod state_store;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
