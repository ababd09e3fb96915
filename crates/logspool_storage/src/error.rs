//! Error types for storage operations.

use logspool_codec::FormatError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while writing segments or maintaining the ledger.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A segment could not be decoded.
    #[error("segment format error: {0}")]
    Format(#[from] FormatError),

    /// The ledger could not be serialized or parsed.
    #[error("ledger encoding error: {0}")]
    Ledger(#[from] serde_json::Error),

    /// Another process holds the segment directory.
    #[error("segment directory {path:?} is locked by another process")]
    DirectoryLocked {
        /// The locked directory.
        path: PathBuf,
    },

    /// The configured location exists but is not a directory.
    #[error("{path:?} is not a directory")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
}
