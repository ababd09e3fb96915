//! What happens to a segment once it is rotated out.

use crate::ledger::PendingLedger;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

/// Receives every segment the writer closes.
///
/// Implementations decide whether a closed segment is queued for upload or
/// only retained locally.
pub trait SegmentArchiver: Send + Sync {
    /// Takes ownership of a closed segment.
    fn archive(&self, path: PathBuf);
}

/// Archiver used when no remote collector is configured.
///
/// Closed segments are recorded in the ledger like any other, but once more
/// than `max_files` are pending the oldest are deleted. Nothing is ever
/// uploaded; this only bounds local disk usage.
#[derive(Debug)]
pub struct CapacityCleaner {
    ledger: Arc<PendingLedger>,
    max_files: usize,
}

impl CapacityCleaner {
    /// Creates a cleaner that keeps at most `max_files` closed segments.
    #[must_use]
    pub fn new(ledger: Arc<PendingLedger>, max_files: usize) -> Self {
        Self { ledger, max_files }
    }

    /// Returns the ledger this cleaner maintains.
    #[must_use]
    pub fn ledger(&self) -> &Arc<PendingLedger> {
        &self.ledger
    }
}

impl SegmentArchiver for CapacityCleaner {
    fn archive(&self, path: PathBuf) {
        if let Err(e) = self.ledger.add(path) {
            error!(error = %e, "failed to persist pending-upload ledger");
        }

        while self.ledger.len() > self.max_files {
            let Some(oldest) = self.ledger.oldest() else {
                break;
            };
            debug!(segment = %oldest.display(), "evicting segment over local capacity");
            if let Err(e) = self.ledger.remove(&oldest) {
                error!(error = %e, "failed to persist pending-upload ledger");
            }
        }
    }
}
