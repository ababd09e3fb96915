//! Error types for segment upload.

use logspool_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for upload operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while uploading a segment.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The collector answered with a non-success status.
    #[error("collector rejected upload with status {0}")]
    Status(u16),

    /// The collector answered with an empty body.
    #[error("collector returned an empty response")]
    EmptyResponse,

    /// The request timed out.
    #[error("operation timed out")]
    Timeout,

    /// The current network is excluded by the upload policy.
    #[error("network not permitted for upload")]
    NetworkUnavailable,

    /// The segment file could not be read.
    #[error("failed to read segment: {0}")]
    Io(#[from] io::Error),

    /// The ledger could not be updated.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The upload worker has stopped.
    #[error("uploader shut down")]
    ShutDown,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a later attempt at the same upload may succeed.
    ///
    /// Every failure leaves the segment in the ledger; this only decides
    /// whether the retry loop backs off or keeps its normal pace.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            SyncError::Timeout | SyncError::NetworkUnavailable | SyncError::EmptyResponse => true,
            SyncError::Io(_) | SyncError::Storage(_) | SyncError::ShutDown => false,
        }
    }
}
