//! # logspool Codec
//!
//! Versioned, human-diffable text encoding for logspool records.
//!
//! This crate provides:
//! - The [`Record`] value type and its [`Severity`] levels
//! - A column-delimited encoding for one record
//! - A row-delimited encoding for a sequence of records
//! - The [`SegmentHeader`] metadata line that starts every segment file
//!
//! ## Encoding Rules
//!
//! - Columns are separated by U+001F and records by U+001E
//! - Text fields never contain either delimiter; they are escaped with
//!   two-character placeholders introduced by U+0010
//! - Empty text is a placeholder token, absent values are zero-length columns
//! - Numbers and timestamps are plain decimal text
//! - Decoding rejects any column count other than the current layout
//!
//! ## Usage
//!
//! ```
//! use logspool_codec::{decode_records, encode_records, Record, Severity};
//!
//! let records = vec![
//!     Record::new(Severity::Info, "user signed in").with_category("auth"),
//!     Record::new(Severity::Error, "token refresh failed"),
//! ];
//!
//! let text = encode_records(&records);
//! let decoded = decode_records(&text).unwrap();
//! assert_eq!(records, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod format;
mod parallel;
mod record;

pub use decoder::{decode_record, decode_records, decode_segment};
pub use encoder::{encode_record, encode_records};
pub use error::{CodecResult, FormatError};
pub use format::{FormatVersion, SegmentHeader, COLUMN_COUNT, COLUMN_DELIMITER, ROW_DELIMITER};
pub use record::{Record, Severity, Timestamp};
