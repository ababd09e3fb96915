//! Upload of single segments to the collector.

use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use crate::network::{NetworkMonitor, NetworkPolicy};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Completion callback for [`Uploader::accept`]; `true` means the collector
/// confirmed the segment.
pub type OnComplete = Box<dyn FnOnce(bool) + Send + 'static>;

/// Pushes one closed segment to a remote collector.
pub trait Uploader: Send + Sync {
    /// Starts uploading the segment at `path`.
    ///
    /// `on_complete` is called exactly once, possibly on another thread.
    fn accept(&self, path: &Path, on_complete: OnComplete);
}

struct Job {
    path: PathBuf,
    on_complete: OnComplete,
}

/// [`Uploader`] that POSTs the raw segment bytes to a collector URL.
///
/// Uploads run one at a time on a dedicated background thread. A segment is
/// reported successful only when the collector answers with a success status
/// and a non-empty body. Anything else reports failure: an unreadable file,
/// a network the policy excludes, a transport error or timeout, an error
/// status, an empty body.
pub struct CollectorUploader {
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CollectorUploader {
    /// Starts the upload worker.
    pub fn new<C>(
        url: impl Into<String>,
        client: C,
        policy: NetworkPolicy,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self
    where
        C: HttpClient + 'static,
    {
        let worker = Worker {
            url: url.into(),
            client,
            policy,
            monitor,
        };
        let (sender, receiver) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name("logspool-upload".into())
            .spawn(move || {
                for job in receiver {
                    let ok = match worker.upload(&job.path) {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(
                                segment = %job.path.display(),
                                url = %worker.url,
                                retryable = e.is_retryable(),
                                error = %e,
                                "segment upload failed"
                            );
                            false
                        }
                    };
                    (job.on_complete)(ok);
                }
            });

        let (sender, worker) = match handle {
            Ok(handle) => (Some(sender), Some(handle)),
            Err(e) => {
                warn!(error = %e, "failed to start upload worker");
                (None, None)
            }
        };

        Self {
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
        }
    }

    /// Stops accepting uploads and waits for queued ones to finish.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Uploader for CollectorUploader {
    fn accept(&self, path: &Path, on_complete: OnComplete) {
        let job = Job {
            path: path.to_path_buf(),
            on_complete,
        };

        let rejected = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(job).err().map(|e| e.0),
            None => Some(job),
        };

        if let Some(job) = rejected {
            debug!(segment = %job.path.display(), error = %SyncError::ShutDown, "upload not queued");
            (job.on_complete)(false);
        }
    }
}

impl Drop for CollectorUploader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker<C> {
    url: String,
    client: C,
    policy: NetworkPolicy,
    monitor: Arc<dyn NetworkMonitor>,
}

impl<C: HttpClient> Worker<C> {
    fn upload(&self, path: &Path) -> SyncResult<()> {
        if !self.policy.permits(&self.monitor.conditions()) {
            return Err(SyncError::NetworkUnavailable);
        }

        let body = fs::read(path)?;
        let response = self.client.post(&self.url, body)?;
        if response.is_empty() {
            return Err(SyncError::EmptyResponse);
        }
        debug!(segment = %path.display(), "segment uploaded");
        Ok(())
    }
}
