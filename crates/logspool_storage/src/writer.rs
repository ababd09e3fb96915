//! Rotating segment writer.

use crate::archiver::SegmentArchiver;
use crate::error::{StorageError, StorageResult};
use crate::sequencer::FilenameSequencer;
use logspool_codec::{encode_records, Record, SegmentHeader};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Out-of-band channel for write failures.
///
/// Segment writes never return errors to the logging caller; they are
/// reported here and the records are dropped.
pub trait FailureReporter: Send + Sync {
    /// Called once per failed write.
    fn report(&self, path: &Path, records: usize, error: &StorageError);
}

/// Reports failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, path: &Path, records: usize, error: &StorageError) {
        error!(
            segment = %path.display(),
            records,
            error = %error,
            "failed to write records to segment"
        );
    }
}

/// Appends encoded records to the current segment and rotates by record
/// count.
///
/// The per-segment limit is advisory: it is checked before each `write`, so
/// a single call carrying more records than the limit still lands in one
/// segment.
pub struct SegmentWriter {
    sequencer: FilenameSequencer,
    max_records: usize,
    current_count: usize,
    sync_on_write: bool,
    archiver: Arc<dyn SegmentArchiver>,
    reporter: Arc<dyn FailureReporter>,
}

impl SegmentWriter {
    /// Creates a writer over the given sequencer.
    #[must_use]
    pub fn new(
        sequencer: FilenameSequencer,
        max_records: usize,
        archiver: Arc<dyn SegmentArchiver>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        Self {
            sequencer,
            max_records: max_records.max(1),
            current_count: 0,
            sync_on_write: false,
            archiver,
            reporter,
        }
    }

    /// Sets whether every write is followed by `fsync`.
    #[must_use]
    pub fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Returns the path of the segment being written.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.sequencer.current()
    }

    /// Returns how many records the current segment holds.
    #[must_use]
    pub fn current_count(&self) -> usize {
        self.current_count
    }

    /// Writes records to the current segment, rotating first if they would
    /// push it past the limit.
    ///
    /// The first write into a segment truncates the file and writes the
    /// header; later writes append. On failure the error goes to the
    /// reporter and the running count is still advanced, so a failing disk
    /// cannot pin the writer on one segment forever.
    pub fn write(&mut self, records: &[Record]) {
        if records.is_empty() {
            return;
        }

        if self.current_count > 0 && self.current_count + records.len() > self.max_records {
            self.rotate();
        }

        let path = self.sequencer.current();
        if let Err(e) = self.append(&path, records) {
            self.reporter.report(&path, records.len(), &e);
        }
        self.current_count += records.len();
    }

    fn append(&self, path: &Path, records: &[Record]) -> StorageResult<()> {
        let body = encode_records(records);

        let mut file = if self.current_count == 0 {
            let mut file = File::create(path)?;
            file.write_all(SegmentHeader::current().encode().as_bytes())?;
            file
        } else {
            OpenOptions::new().append(true).create(true).open(path)?
        };

        file.write_all(body.as_bytes())?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Hands every segment an earlier run left on disk to the archiver.
    ///
    /// A run that ended without rotating leaves its last segment outside
    /// the ledger; this puts it back. Segments already pending are passed
    /// again, which the ledger ignores. Returns how many were handed over.
    pub fn recover(&self) -> usize {
        let leftovers = self.sequencer.leftover_segments();
        for path in &leftovers {
            self.archiver.archive(path.clone());
        }
        if !leftovers.is_empty() {
            debug!(
                dir = %self.sequencer.dir().display(),
                segments = leftovers.len(),
                "recovered segments from an earlier run"
            );
        }
        leftovers.len()
    }

    /// Closes the current segment and hands it to the archiver.
    ///
    /// Returns the closed path, or `None` if the current segment is empty.
    pub fn rotate(&mut self) -> Option<PathBuf> {
        if self.current_count == 0 {
            return None;
        }

        let closed = self.sequencer.advance();
        self.current_count = 0;
        debug!(segment = %closed.display(), "rotated segment");
        self.archiver.archive(closed.clone());
        Some(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::SegmentDir;
    use crate::reader::read_segment;
    use logspool_codec::Severity;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Collect(Mutex<Vec<PathBuf>>);

    impl SegmentArchiver for Collect {
        fn archive(&self, path: PathBuf) {
            self.0.lock().push(path);
        }
    }

    #[derive(Default)]
    struct CountFailures(Mutex<usize>);

    impl FailureReporter for CountFailures {
        fn report(&self, _path: &Path, _records: usize, _error: &StorageError) {
            *self.0.lock() += 1;
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(Severity::Info, format!("record {i}")))
            .collect()
    }

    fn writer(path: &Path, max_records: usize) -> (SegmentWriter, Arc<Collect>) {
        let archived = Arc::new(Collect::default());
        let sequencer = FilenameSequencer::new(SegmentDir::open(path).unwrap(), 100);
        let writer = SegmentWriter::new(
            sequencer,
            max_records,
            archived.clone(),
            Arc::new(TracingReporter),
        );
        (writer, archived)
    }

    #[test]
    fn first_write_adds_header() {
        let temp = tempdir().unwrap();
        let (mut writer, _) = writer(temp.path(), 10);

        let batch = records(3);
        writer.write(&batch);

        let (header, decoded) = read_segment(&temp.path().join("0")).unwrap();
        assert_eq!(header, SegmentHeader::current());
        assert_eq!(decoded, batch);
        assert_eq!(writer.current_count(), 3);
    }

    #[test]
    fn later_writes_append() {
        let temp = tempdir().unwrap();
        let (mut writer, _) = writer(temp.path(), 10);

        let first = records(2);
        let second = records(4);
        writer.write(&first);
        writer.write(&second);

        let (_, decoded) = read_segment(&temp.path().join("0")).unwrap();
        assert_eq!(decoded.len(), 6);
        assert_eq!(&decoded[..2], &first[..]);
        assert_eq!(&decoded[2..], &second[..]);
    }

    #[test]
    fn rotates_before_exceeding_limit() {
        let temp = tempdir().unwrap();
        let (mut writer, archived) = writer(temp.path(), 5);

        writer.write(&records(3));
        writer.write(&records(3));

        assert_eq!(*archived.0.lock(), vec![temp.path().join("0")]);
        assert_eq!(writer.current_path(), temp.path().join("1"));
        assert_eq!(read_segment(&temp.path().join("0")).unwrap().1.len(), 3);
        assert_eq!(read_segment(&temp.path().join("1")).unwrap().1.len(), 3);
    }

    #[test]
    fn oversized_batch_stays_in_one_segment() {
        let temp = tempdir().unwrap();
        let (mut writer, archived) = writer(temp.path(), 5);

        writer.write(&records(12));

        assert!(archived.0.lock().is_empty());
        assert_eq!(read_segment(&temp.path().join("0")).unwrap().1.len(), 12);
    }

    #[test]
    fn rotate_on_empty_segment_is_noop() {
        let temp = tempdir().unwrap();
        let (mut writer, archived) = writer(temp.path(), 5);

        assert_eq!(writer.rotate(), None);
        writer.write(&records(1));
        assert_eq!(writer.rotate(), Some(temp.path().join("0")));
        assert_eq!(archived.0.lock().len(), 1);
    }

    #[test]
    fn recover_archives_unrotated_segment() {
        let temp = tempdir().unwrap();
        {
            let (mut writer, archived) = writer(temp.path(), 10);
            writer.write(&records(2));
            assert!(archived.0.lock().is_empty());
        }

        let (writer, archived) = writer(temp.path(), 10);
        assert_eq!(writer.recover(), 1);
        assert_eq!(*archived.0.lock(), vec![temp.path().join("0")]);
        assert_eq!(writer.current_path(), temp.path().join("1"));
    }

    #[test]
    fn failure_is_reported_and_count_advances() {
        let temp = tempdir().unwrap();
        let dir = SegmentDir::open(temp.path()).unwrap();
        let sequencer = FilenameSequencer::new(dir, 100);
        // A directory where the segment file should be makes every write fail.
        std::fs::create_dir(temp.path().join("0")).unwrap();

        let failures = Arc::new(CountFailures::default());
        let mut writer = SegmentWriter::new(
            sequencer,
            10,
            Arc::new(Collect::default()),
            failures.clone(),
        );

        writer.write(&records(2));
        assert_eq!(*failures.0.lock(), 1);
        assert_eq!(writer.current_count(), 2);
    }
}
