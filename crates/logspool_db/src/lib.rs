//! # logspool DB
//!
//! An embedded SQLite log store with pull-based incremental sync.
//!
//! Where the segment pipeline pushes closed files to a collector, this
//! store keeps every record as a row and lets a consumer pull what it has
//! not yet delivered:
//!
//! ```rust
//! use logspool_codec::{Record, Severity};
//! use logspool_core::Sink;
//! use logspool_db::EmbeddedStore;
//!
//! let temp = tempfile::tempdir().unwrap();
//! let store = EmbeddedStore::open(temp.path(), "logs").unwrap();
//!
//! store.log(Record::new(Severity::Info, "first"));
//! store.log(Record::new(Severity::Info, "second"));
//!
//! let batch = store.get_sync_batch(10).unwrap();
//! assert_eq!(batch.len(), 2);
//!
//! // Deliver the batch elsewhere, then advance the cursor.
//! store.set_last_synced_id(batch[1].id.unwrap()).unwrap();
//! assert!(store.get_sync_batch(10).unwrap().is_empty());
//! ```
//!
//! ## Key Invariants
//!
//! - Record ids are assigned by the store and strictly increase
//! - The sync cursor is a single persisted row and never moves back
//! - `get_sync_batch` returns only ids above the cursor, ascending

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod schema;
mod store;

pub use error::{DbError, DbResult};
pub use store::{EmbeddedStore, SyncCursor};
