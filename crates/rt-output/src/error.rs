//! Error types for rt-output.

use thiserror::Error;

/// Errors raised by sinks and publishers.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// A publisher could not hand an event to its transport.
    #[error("publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
