// Service error types
// One enum covering every failure the runner itself can produce

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::lock::LockError;

/// Result type for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Top-level error for the refresh service
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The overlap lock could not be acquired or managed
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The status report could not be written
    #[error("failed to write status report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Miscellaneous I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
