//! Format constants and the version triple carried by segment headers.

use crate::error::{CodecResult, FormatError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separates records inside a sequence. Never emitted for field content.
pub const ROW_DELIMITER: char = '\u{1e}';

/// Separates columns inside one record. Never emitted for field content.
pub const COLUMN_DELIMITER: char = '\u{1f}';

/// Introduces a placeholder sequence inside an escaped field.
pub(crate) const ESCAPE: char = '\u{10}';

/// Placeholder for a present-but-empty text field.
///
/// An absent optional field is written as a zero-length column, so this token
/// keeps `Some("")` and `None` apart after the column split. The escaper never
/// emits `ESCAPE` followed by `'0'` for real content.
pub(crate) const EMPTY_FIELD: &str = "\u{10}0";

/// Number of columns written per record by format 1.x.
pub const COLUMN_COUNT: usize = 14;

/// Major/minor/patch version of the on-disk encoding.
///
/// Decoders accept any version sharing their major number; a major bump
/// means the column layout changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    /// Incompatible layout changes.
    pub major: u8,
    /// Backwards compatible additions.
    pub minor: u8,
    /// Fixes.
    pub patch: u8,
}

impl FormatVersion {
    /// The version written by this build.
    pub const CURRENT: FormatVersion = FormatVersion::new(1, 0, 0);

    /// Creates a version triple.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns true if this build can decode segments of this version.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for FormatVersion {
    type Err = FormatError;

    fn from_str(s: &str) -> CodecResult<Self> {
        let parts = s
            .split('.')
            .map(str::parse::<u8>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| FormatError::invalid_header(format!("bad version number: {s}")))?;

        match parts.as_slice() {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(FormatError::invalid_header(format!(
                "version must have three components: {s}"
            ))),
        }
    }
}

/// Metadata record written once at the top of every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Encoding used by the records that follow.
    pub version: FormatVersion,
}

#[derive(Serialize, Deserialize)]
struct HeaderRepr {
    version: String,
}

impl SegmentHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn current() -> Self {
        Self {
            version: FormatVersion::CURRENT,
        }
    }

    /// Encodes the header as a single JSON line, e.g. `{"version":"1.0.0"}`.
    #[must_use]
    pub fn encode(&self) -> String {
        let repr = HeaderRepr {
            version: self.version.to_string(),
        };
        // A struct holding one String always serializes.
        serde_json::to_string(&repr).unwrap_or_default()
    }

    /// Decodes a header produced by [`SegmentHeader::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidHeader`] if the text is not a header and
    /// [`FormatError::UnsupportedVersion`] if the major version differs.
    pub fn decode(text: &str) -> CodecResult<Self> {
        let repr: HeaderRepr = serde_json::from_str(text.trim_end())
            .map_err(|e| FormatError::invalid_header(e.to_string()))?;
        let version: FormatVersion = repr.version.parse()?;

        if !version.is_supported() {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: FormatVersion::CURRENT,
            });
        }

        Ok(Self { version })
    }
}
