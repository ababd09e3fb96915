//! Segment reader.

use crate::error::StorageResult;
use logspool_codec::{decode_segment, Record, SegmentHeader};
use std::fs;
use std::path::Path;

/// Reads and decodes a whole segment file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not UTF-8, or does not
/// decode with the current format.
pub fn read_segment(path: &Path) -> StorageResult<(SegmentHeader, Vec<Record>)> {
    let text = fs::read_to_string(path)?;
    Ok(decode_segment(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_io_error() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            read_segment(&temp.path().join("9")),
            Err(StorageError::Io(_))
        ));
    }

    #[test]
    fn garbage_is_format_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("0");
        fs::write(&path, "not a header").unwrap();
        assert!(matches!(read_segment(&path), Err(StorageError::Format(_))));
    }
}
