//! Error types for the codec crate.

use crate::format::FormatVersion;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, FormatError>;

/// Errors raised while decoding records, sequences or segment headers.
///
/// Every variant signals that the text on disk was produced by a different
/// encoding scheme than the one this decoder understands. None of them are
/// recoverable by retrying; the fix is a codec version bump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The number of decoded columns does not match the encoded layout.
    #[error("column count mismatch: expected {expected}, found {actual}")]
    ColumnCount {
        /// Columns written by the current encoder.
        expected: usize,
        /// Columns found in the input.
        actual: usize,
    },

    /// The severity column holds a value outside the known levels.
    #[error("unknown severity value: {0}")]
    UnknownSeverity(u8),

    /// A column could not be parsed into its type.
    #[error("invalid value {value:?} in column `{column}`")]
    InvalidField {
        /// Name of the column.
        column: &'static str,
        /// The raw column text.
        value: String,
    },

    /// A required column was encoded as absent.
    #[error("required column `{column}` is absent")]
    MissingField {
        /// Name of the column.
        column: &'static str,
    },

    /// A record sequence did not start with the row delimiter.
    #[error("record sequence does not start with a row delimiter")]
    MissingRowDelimiter,

    /// The segment header could not be parsed.
    #[error("invalid segment header: {message}")]
    InvalidHeader {
        /// Description of the problem.
        message: String,
    },

    /// The segment was written by an incompatible format version.
    #[error("unsupported format version {found} (this build reads {supported})")]
    UnsupportedVersion {
        /// Version found in the header.
        found: FormatVersion,
        /// Version this decoder understands.
        supported: FormatVersion,
    },
}

impl FormatError {
    /// Create an invalid field error.
    pub fn invalid_field(column: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidField {
            column,
            value: value.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }
}
