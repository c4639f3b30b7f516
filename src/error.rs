use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a scanning unit did not finish cleanly.
#[derive(Debug, Error)]
pub enum WorkerStatus {
    #[error("i/o error")]
    Io(#[source] io::Error),
    #[error("panicked: {0}")]
    Panicked(String),
}

/// Errors produced by a counting run. Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("worker {index} exited abnormally")]
    WorkerFailure {
        index: usize,
        #[source]
        status: WorkerStatus,
    },
    #[error("malformed key {key:?}: {reason}")]
    Format { key: String, reason: &'static str },
    #[error("failed to write {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Index of the failing unit, when the failure is attributable to one.
    pub fn worker_index(&self) -> Option<usize> {
        match self {
            Error::WorkerFailure { index, .. } => Some(*index),
            _ => None,
        }
    }
}
