//! Ledger-driven upload of closed segments.

use crate::config::RetryConfig;
use crate::uploader::Uploader;
use logspool_storage::{PendingLedger, SegmentArchiver};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

struct Shared {
    ledger: Arc<PendingLedger>,
    in_flight: Mutex<HashSet<PathBuf>>,
    consecutive_failures: AtomicU32,
}

impl Shared {
    fn complete(&self, path: PathBuf, ok: bool) {
        if ok {
            if let Err(e) = self.ledger.remove(&path) {
                error!(segment = %path.display(), error = %e, "failed to persist pending-upload ledger");
            }
            self.consecutive_failures.store(0, Ordering::SeqCst);
        } else {
            self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        }
        self.in_flight.lock().remove(&path);
    }
}

/// Uploads closed segments listed in the pending-upload ledger.
///
/// # Invariants
///
/// - A path is never submitted to the uploader while a previous submission
///   of it is still outstanding
/// - A ledger entry is removed (and its file deleted) only after the
///   uploader reports success for that exact path
/// - Failed uploads stay in the ledger for a later pass
pub struct FileSynchronizer {
    shared: Arc<Shared>,
    uploader: Arc<dyn Uploader>,
    batch_size: usize,
}

impl FileSynchronizer {
    /// Creates a synchronizer that submits at most `batch_size` segments
    /// per pass.
    pub fn new(ledger: Arc<PendingLedger>, uploader: Arc<dyn Uploader>, batch_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                ledger,
                in_flight: Mutex::new(HashSet::new()),
                consecutive_failures: AtomicU32::new(0),
            }),
            uploader,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns the ledger this synchronizer drains.
    pub fn ledger(&self) -> &Arc<PendingLedger> {
        &self.shared.ledger
    }

    /// Returns the number of uploads currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    /// Returns how many uploads have failed since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.shared.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Submits the oldest pending segments that are not already in flight.
    ///
    /// Entries whose file no longer exists are dropped from the ledger.
    /// Returns how many uploads were started.
    pub fn sync_pending(&self) -> usize {
        let mut submitted = 0;

        for path in self.shared.ledger.next_batch(self.batch_size) {
            if !path.exists() {
                warn!(segment = %path.display(), "pending segment is missing; dropping it");
                if let Err(e) = self.shared.ledger.remove(&path) {
                    error!(error = %e, "failed to persist pending-upload ledger");
                }
                continue;
            }

            if !self.shared.in_flight.lock().insert(path.clone()) {
                continue;
            }

            debug!(segment = %path.display(), "submitting segment");
            let shared = Arc::clone(&self.shared);
            let done = path.clone();
            self.uploader
                .accept(&path, Box::new(move |ok| shared.complete(done, ok)));
            submitted += 1;
        }

        submitted
    }

    /// Runs [`sync_pending`](Self::sync_pending) on a background thread.
    ///
    /// The loop waits `interval` between passes while uploads succeed and
    /// backs off per `retry` after failures. It stops when the returned
    /// handle is dropped.
    pub fn spawn_retry_loop(
        self: &Arc<Self>,
        interval: Duration,
        retry: RetryConfig,
    ) -> std::io::Result<RetryLoop> {
        let (stop, stopped) = mpsc::channel::<()>();
        let synchronizer = Arc::clone(self);

        let handle = thread::Builder::new()
            .name("logspool-retry".into())
            .spawn(move || loop {
                let failures = synchronizer.consecutive_failures();
                let wait = if failures == 0 {
                    interval
                } else {
                    retry.delay_for_attempt(failures)
                };

                match stopped.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        synchronizer.sync_pending();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(RetryLoop {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl SegmentArchiver for FileSynchronizer {
    fn archive(&self, path: PathBuf) {
        if let Err(e) = self.shared.ledger.add(path) {
            error!(error = %e, "failed to persist pending-upload ledger");
        }
        self.sync_pending();
    }
}

/// Handle to a running retry loop; dropping it stops the loop.
pub struct RetryLoop {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RetryLoop {
    /// Stops the loop and waits for the current pass to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RetryLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::OnComplete;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Holds callbacks until the test resolves them.
    #[derive(Default)]
    struct Manual {
        submitted: Mutex<Vec<PathBuf>>,
        callbacks: Mutex<Vec<(PathBuf, OnComplete)>>,
    }

    impl Manual {
        fn resolve_all(&self, ok: bool) {
            let callbacks: Vec<_> = self.callbacks.lock().drain(..).collect();
            for (_, cb) in callbacks {
                cb(ok);
            }
        }
    }

    impl Uploader for Manual {
        fn accept(&self, path: &Path, on_complete: OnComplete) {
            self.submitted.lock().push(path.to_path_buf());
            self.callbacks.lock().push((path.to_path_buf(), on_complete));
        }
    }

    fn setup(batch: usize) -> (tempfile::TempDir, Arc<Manual>, FileSynchronizer) {
        let temp = tempdir().unwrap();
        let ledger = Arc::new(PendingLedger::open(temp.path().join("pending.json")));
        let manual = Arc::new(Manual::default());
        let sync = FileSynchronizer::new(ledger, manual.clone(), batch);
        (temp, manual, sync)
    }

    fn segment(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"segment").unwrap();
        path
    }

    #[test]
    fn success_removes_entry_and_file() {
        let (temp, manual, sync) = setup(5);
        let path = segment(temp.path(), "0");

        sync.archive(path.clone());
        assert_eq!(sync.in_flight(), 1);

        manual.resolve_all(true);
        assert!(!sync.ledger().contains(&path));
        assert!(!path.exists());
        assert_eq!(sync.in_flight(), 0);
    }

    #[test]
    fn failure_keeps_entry() {
        let (temp, manual, sync) = setup(5);
        let path = segment(temp.path(), "0");

        sync.archive(path.clone());
        manual.resolve_all(false);

        assert!(sync.ledger().contains(&path));
        assert!(path.exists());
        assert_eq!(sync.in_flight(), 0);
        assert_eq!(sync.consecutive_failures(), 1);
    }

    #[test]
    fn in_flight_path_is_not_resubmitted() {
        let (temp, manual, sync) = setup(5);
        let path = segment(temp.path(), "0");

        sync.archive(path.clone());
        assert_eq!(sync.sync_pending(), 0);
        assert_eq!(manual.submitted.lock().len(), 1);

        manual.resolve_all(false);
        assert_eq!(sync.sync_pending(), 1);
        assert_eq!(manual.submitted.lock().len(), 2);
    }

    #[test]
    fn pass_is_bounded_by_batch_size() {
        let (temp, manual, sync) = setup(2);
        for i in 0..4 {
            sync.ledger().add(segment(temp.path(), &i.to_string())).unwrap();
        }

        assert_eq!(sync.sync_pending(), 2);
        assert_eq!(
            *manual.submitted.lock(),
            vec![temp.path().join("0"), temp.path().join("1")]
        );
    }

    #[test]
    fn missing_segment_is_dropped() {
        let (temp, manual, sync) = setup(5);
        sync.ledger().add(temp.path().join("gone")).unwrap();

        assert_eq!(sync.sync_pending(), 0);
        assert!(sync.ledger().is_empty());
        assert!(manual.submitted.lock().is_empty());
    }

    #[test]
    fn success_resets_failure_count() {
        let (temp, manual, sync) = setup(5);
        sync.archive(segment(temp.path(), "0"));
        manual.resolve_all(false);
        sync.sync_pending();
        manual.resolve_all(true);
        assert_eq!(sync.consecutive_failures(), 0);
    }

    #[test]
    fn retry_loop_resubmits_and_stops() {
        let (temp, manual, sync) = setup(5);
        let sync = Arc::new(sync);
        sync.ledger().add(segment(temp.path(), "0")).unwrap();

        let retry = sync
            .spawn_retry_loop(Duration::from_millis(10), RetryConfig::default())
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while manual.submitted.lock().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        retry.stop();

        assert_eq!(manual.submitted.lock().len(), 1);
    }
}
