//! Error types for the store and logger.

use logspool_storage::StorageError;
use logspool_sync::SyncError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while setting up a store or logger.
///
/// Logging itself never returns errors; only construction and
/// configuration do.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Segment directories or the ledger could not be set up.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The upload path could not be set up.
    #[error("upload error: {0}")]
    Sync(#[from] SyncError),

    /// A background thread could not be started.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// [`Logger::configure`](crate::Logger::configure) was called twice.
    #[error("logger already configured")]
    AlreadyConfigured,

    /// The global logger was used before being configured.
    #[error("logger not configured")]
    NotConfigured,
}
