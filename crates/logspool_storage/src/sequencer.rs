//! Ring-index filename sequencer.

use crate::dir::SegmentDir;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Produces the path of the current segment and advances around a bounded
/// ring of integer filenames.
///
/// # Invariants
///
/// - The index is always in `[0, max_files)`
/// - On open, the index resumes one past the most recently written segment
///   on disk, so a restart after the ring wrapped does not land on the
///   files written just before it
/// - `advance` returns the path that was current before the call
#[derive(Debug)]
pub struct FilenameSequencer {
    dir: SegmentDir,
    max_files: u32,
    index: u32,
}

impl FilenameSequencer {
    /// Creates a sequencer over `dir`, resuming after the newest segment.
    ///
    /// "Newest" is by modification time, not by index: once the ring has
    /// wrapped, `0..2` are newer than `995..999`.
    ///
    /// A `max_files` of zero is treated as one. If the directory cannot be
    /// scanned the ring starts at index 0.
    #[must_use]
    pub fn new(dir: SegmentDir, max_files: u32) -> Self {
        let max_files = max_files.max(1);

        let newest = match dir.segments_by_age() {
            Ok(segments) => segments.last().copied(),
            Err(e) => {
                warn!(dir = %dir.path().display(), error = %e, "failed to scan segment directory");
                None
            }
        };

        let index = match newest {
            Some(newest) if newest.saturating_add(1) < max_files => newest + 1,
            _ => 0,
        };

        Self {
            dir,
            max_files,
            index,
        }
    }

    /// Returns segments left on disk by earlier runs, oldest first.
    ///
    /// The current segment is excluded; it is about to be overwritten.
    #[must_use]
    pub fn leftover_segments(&self) -> Vec<PathBuf> {
        match self.dir.segments_by_age() {
            Ok(segments) => segments
                .into_iter()
                .filter(|&index| index != self.index)
                .map(|index| self.dir.segment_path(index))
                .collect(),
            Err(e) => {
                warn!(dir = %self.dir.path().display(), error = %e, "failed to scan segment directory");
                Vec::new()
            }
        }
    }

    /// Returns the path of the segment currently being written.
    #[must_use]
    pub fn current(&self) -> PathBuf {
        self.dir.segment_path(self.index)
    }

    /// Returns the current ring index.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the size of the ring.
    #[must_use]
    pub fn max_files(&self) -> u32 {
        self.max_files
    }

    /// Returns the directory the ring lives in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Moves to the next index, wrapping at `max_files`.
    ///
    /// Returns the path that was current before the call. The caller owns
    /// handing it to the pending-upload ledger.
    pub fn advance(&mut self) -> PathBuf {
        let old = self.current();
        self.index = (self.index + 1) % self.max_files;
        old
    }
}
