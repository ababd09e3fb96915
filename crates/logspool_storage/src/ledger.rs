//! Durable list of closed segments awaiting upload.

use crate::error::StorageResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

#[derive(Debug, Serialize, Deserialize)]
struct LedgerEntry {
    path: PathBuf,
}

/// A persisted, ordered list of segment paths that still need uploading.
///
/// The ledger file is a JSON array of `{"path": ...}` objects rewritten with
/// write-then-rename on every mutation. All mutations hold the ledger lock
/// across the in-memory change and the rewrite, so concurrent rotation and
/// upload completion never interleave a read-modify-write.
///
/// # Failure policy
///
/// - A missing ledger file loads as an empty ledger
/// - An unreadable or corrupt ledger file is logged and loads as empty
/// - A failed rewrite is returned to the caller, but the in-memory change is
///   kept so the running process still makes progress
#[derive(Debug)]
pub struct PendingLedger {
    file: PathBuf,
    entries: Mutex<Vec<PathBuf>>,
}

impl PendingLedger {
    /// Loads the ledger stored at `file`.
    pub fn open(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let entries = Self::load(&file);
        Self {
            file,
            entries: Mutex::new(entries),
        }
    }

    fn load(file: &Path) -> Vec<PathBuf> {
        let data = match fs::read(file) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                error!(ledger = %file.display(), error = %e, "failed to read pending-upload ledger");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<LedgerEntry>>(&data) {
            Ok(entries) => entries.into_iter().map(|e| e.path).collect(),
            Err(e) => {
                error!(
                    ledger = %file.display(),
                    contents = %String::from_utf8_lossy(&data),
                    error = %e,
                    "failed to decode pending-upload ledger"
                );
                Vec::new()
            }
        }
    }

    /// Writes the entries with write-then-rename.
    fn persist(&self, entries: &[PathBuf]) -> StorageResult<()> {
        let repr: Vec<LedgerEntry> = entries
            .iter()
            .map(|path| LedgerEntry { path: path.clone() })
            .collect();
        let data = serde_json::to_vec(&repr)?;

        let mut temp_name = self.file.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = self.file.with_file_name(temp_name);

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.file)?;
        Ok(())
    }

    /// Returns the path of the ledger file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Appends a closed segment.
    ///
    /// Adding a path that is already pending is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger file could not be rewritten.
    pub fn add(&self, path: impl Into<PathBuf>) -> StorageResult<()> {
        let path = path.into();
        let mut entries = self.entries.lock();
        if entries.contains(&path) {
            return Ok(());
        }
        debug!(segment = %path.display(), "segment pending upload");
        entries.push(path);
        self.persist(&entries)
    }

    /// Drops a segment from the ledger and deletes its file.
    ///
    /// A segment file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger file could not be rewritten.
    pub fn remove(&self, path: &Path) -> StorageResult<()> {
        let mut entries = self.entries.lock();

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(segment = %path.display(), error = %e, "failed to delete segment file");
            }
        }

        entries.retain(|p| p != path);
        self.persist(&entries)
    }

    /// Returns up to `limit` pending segments, oldest first.
    #[must_use]
    pub fn next_batch(&self, limit: usize) -> Vec<PathBuf> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    /// Returns the oldest pending segment.
    #[must_use]
    pub fn oldest(&self) -> Option<PathBuf> {
        self.entries.lock().first().cloned()
    }

    /// Returns true if `path` is pending.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().iter().any(|p| p == path)
    }

    /// Returns the number of pending segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let ledger = PendingLedger::open(temp.path().join("pending.json"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("pending.json");
        fs::write(&file, b"{not json").unwrap();

        let ledger = PendingLedger::open(&file);
        assert!(ledger.is_empty());
    }

    #[test]
    fn entries_survive_reopen() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("pending.json");

        {
            let ledger = PendingLedger::open(&file);
            ledger.add(temp.path().join("0")).unwrap();
            ledger.add(temp.path().join("1")).unwrap();
        }

        let ledger = PendingLedger::open(&file);
        assert_eq!(
            ledger.next_batch(10),
            vec![temp.path().join("0"), temp.path().join("1")]
        );
    }

    #[test]
    fn file_format_is_json_array() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("pending.json");
        let ledger = PendingLedger::open(&file);
        ledger.add("/tmp/segments/4").unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&file).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([{ "path": "/tmp/segments/4" }]));
        assert!(!temp.path().join("pending.json.tmp").exists());
    }

    #[test]
    fn next_batch_is_bounded_and_ordered() {
        let temp = tempdir().unwrap();
        let ledger = PendingLedger::open(temp.path().join("pending.json"));
        for i in 0..8 {
            ledger.add(temp.path().join(i.to_string())).unwrap();
        }

        let batch = ledger.next_batch(5);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch[0], temp.path().join("0"));
        assert_eq!(batch[4], temp.path().join("4"));
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let temp = tempdir().unwrap();
        let ledger = PendingLedger::open(temp.path().join("pending.json"));
        ledger.add(temp.path().join("0")).unwrap();
        ledger.add(temp.path().join("0")).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn remove_deletes_file_and_entry() {
        let temp = tempdir().unwrap();
        let segment = temp.path().join("0");
        fs::write(&segment, b"data").unwrap();

        let ledger = PendingLedger::open(temp.path().join("pending.json"));
        ledger.add(&segment).unwrap();
        ledger.remove(&segment).unwrap();

        assert!(!segment.exists());
        assert!(!ledger.contains(&segment));

        let reopened = PendingLedger::open(temp.path().join("pending.json"));
        assert!(reopened.is_empty());
    }

    #[test]
    fn remove_tolerates_missing_file() {
        let temp = tempdir().unwrap();
        let ledger = PendingLedger::open(temp.path().join("pending.json"));
        ledger.add(temp.path().join("gone")).unwrap();
        ledger.remove(&temp.path().join("gone")).unwrap();
        assert!(ledger.is_empty());
    }
}
