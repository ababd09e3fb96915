//! Segment directory management.
//!
//! A segment directory holds one ring of numbered segment files:
//!
//! ```text
//! <dir>/
//! ├─ LOCK      # Advisory lock for single-writer
//! ├─ 0         # Segment files, named by ring index
//! ├─ 1
//! └─ ...
//! ```
//!
//! The LOCK file ensures only one process rotates the ring at a time.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const LOCK_FILE: &str = "LOCK";

/// An exclusively locked directory of segment files.
///
/// The lock is held for the lifetime of the value and released on drop.
#[derive(Debug)]
pub struct SegmentDir {
    path: PathBuf,
    _lock_file: File,
}

impl SegmentDir {
    /// Opens or creates a segment directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The path exists but is not a directory
    /// - Another process holds the lock (`DirectoryLocked`)
    pub fn open(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::DirectoryLocked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the segment with the given ring index.
    #[must_use]
    pub fn segment_path(&self, index: u32) -> PathBuf {
        self.path.join(index.to_string())
    }

    /// Lists the ring indices of segment files currently on disk, oldest
    /// first.
    ///
    /// Age is the file's modification time, with the ring index breaking
    /// ties. Entries whose name is not a plain integer (the lock file, temp
    /// files) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn segments_by_age(&self) -> StorageResult<Vec<u32>> {
        let mut segments = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let Some(index) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            segments.push((modified, index));
        }
        segments.sort_unstable();
        Ok(segments.into_iter().map(|(_, index)| index).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("segments");

        let dir = SegmentDir::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(dir.path(), path);
    }

    #[test]
    fn open_rejects_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("not-a-dir");
        fs::write(&path, b"x").unwrap();

        assert!(matches!(
            SegmentDir::open(&path),
            Err(StorageError::NotADirectory { .. })
        ));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let _dir = SegmentDir::open(temp.path()).unwrap();

        assert!(matches!(
            SegmentDir::open(temp.path()),
            Err(StorageError::DirectoryLocked { .. })
        ));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        {
            let _dir = SegmentDir::open(temp.path()).unwrap();
        }
        let _again = SegmentDir::open(temp.path()).unwrap();
    }

    #[test]
    fn segments_by_age_ignores_other_files() {
        let temp = tempdir().unwrap();
        let dir = SegmentDir::open(temp.path()).unwrap();

        for name in ["3", "0", "12", "notes.txt", "7.tmp"] {
            fs::write(temp.path().join(name), b"").unwrap();
        }
        let mut listed = dir.segments_by_age().unwrap();
        listed.sort_unstable();

        assert_eq!(listed, vec![0, 3, 12]);
        assert_eq!(dir.segment_path(5), temp.path().join("5"));
    }

    #[test]
    fn segments_by_age_orders_by_modification_time() {
        let temp = tempdir().unwrap();
        let dir = SegmentDir::open(temp.path()).unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        for (name, offset) in [("998", 1), ("999", 2), ("0", 3), ("1", 4)] {
            let file = File::create(temp.path().join(name)).unwrap();
            file.set_modified(base + Duration::from_secs(offset)).unwrap();
        }

        assert_eq!(dir.segments_by_age().unwrap(), vec![998, 999, 0, 1]);
    }
}
