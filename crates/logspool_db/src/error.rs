//! Error types for the embedded store.

use std::io;
use thiserror::Error;

/// Result type for embedded store operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in the embedded store.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database engine reported a failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store was used after [`disconnect`](crate::EmbeddedStore::disconnect).
    #[error("store is not connected")]
    NotConnected,

    /// The sync cursor may only move forward.
    #[error("sync cursor cannot move back from {current} to {requested}")]
    CursorRegression {
        /// Cursor value already persisted.
        current: u64,
        /// Rejected value.
        requested: u64,
    },

    /// Record ids never exceed `i64::MAX`, so neither may the cursor.
    #[error("record id {0} is out of range")]
    IdOutOfRange(u64),
}
