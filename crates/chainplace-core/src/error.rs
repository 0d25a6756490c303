//! Error types for loading placement inputs.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for input loading.
pub type InputResult<T> = Result<T, InputError>;

/// Errors raised while reading configuration and input files.
///
/// All of these are fatal for a placement run.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("profiling table has no `constraints` entry for the total core budget")]
    MissingCoreBudget,

    #[error("invalid device descriptor: {0}")]
    Device(String),

    #[error("device index {index} out of range ({available} devices described)")]
    NoSuchDevice { index: usize, available: usize },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl InputError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InputError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        InputError::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
