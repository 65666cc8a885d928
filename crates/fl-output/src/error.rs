//! Event-log errors.

use thiserror::Error;

/// Failure while appending to or flushing an event log backend.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("event log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event log CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "sqlite")]
    #[error("event log database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;
