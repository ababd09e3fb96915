//! # logspool Storage
//!
//! Local segment storage for logspool.
//!
//! This crate provides the on-disk half of the pipeline:
//!
//! - [`SegmentDir`] - An exclusively locked directory of numbered segments
//! - [`FilenameSequencer`] - The current segment path and ring rotation
//! - [`SegmentWriter`] - Appends encoded records, rotating by record count
//! - [`PendingLedger`] - Durable list of closed segments awaiting upload
//! - [`CapacityCleaner`] - Bounds local disk use when nothing is uploaded
//!
//! ## Design Principles
//!
//! - Writes never fail the caller; failures go to a [`FailureReporter`]
//! - The ledger, not memory, is the source of truth for pending uploads
//! - Restarts resume the ring after the newest segment on disk
//!
//! ## Example
//!
//! ```rust
//! use logspool_codec::{Record, Severity};
//! use logspool_storage::{
//!     read_segment, CapacityCleaner, FilenameSequencer, PendingLedger, SegmentDir,
//!     SegmentWriter, TracingReporter,
//! };
//! use std::sync::Arc;
//!
//! let temp = tempfile::tempdir().unwrap();
//! let ledger = Arc::new(PendingLedger::open(temp.path().join("pending.json")));
//! let dir = SegmentDir::open(&temp.path().join("segments")).unwrap();
//!
//! let mut writer = SegmentWriter::new(
//!     FilenameSequencer::new(dir, 1000),
//!     10_000,
//!     Arc::new(CapacityCleaner::new(Arc::clone(&ledger), 10)),
//!     Arc::new(TracingReporter),
//! );
//!
//! writer.write(&[Record::new(Severity::Info, "hello")]);
//! let closed = writer.rotate().unwrap();
//!
//! assert!(ledger.contains(&closed));
//! assert_eq!(read_segment(&closed).unwrap().1.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod archiver;
mod dir;
mod error;
mod ledger;
mod reader;
mod sequencer;
mod writer;

pub use archiver::{CapacityCleaner, SegmentArchiver};
pub use dir::SegmentDir;
pub use error::{StorageError, StorageResult};
pub use ledger::PendingLedger;
pub use reader::read_segment;
pub use sequencer::FilenameSequencer;
pub use writer::{FailureReporter, SegmentWriter, TracingReporter};
