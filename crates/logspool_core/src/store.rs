//! The buffering segment store.

use crate::config::StoreConfig;
use crate::error::CoreResult;
use crate::save::PendingSave;
use crate::sink::Sink;
use logspool_codec::Record;
use logspool_storage::{
    CapacityCleaner, FailureReporter, FilenameSequencer, PendingLedger, SegmentArchiver,
    SegmentDir, SegmentWriter, TracingReporter,
};
use logspool_sync::{
    AlwaysOnline, CollectorUploader, FileSynchronizer, ReqwestClient, RetryConfig, RetryLoop,
    Uploader,
};
use parking_lot::Mutex;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Work for the background writer, processed in order.
enum Command {
    Save(PendingSave),
    Rotate(Sender<()>),
    Barrier(Sender<()>),
}

#[derive(Default)]
struct BufferState {
    buffer: Vec<Record>,
    /// Saves dispatched to the background writer and not yet written,
    /// oldest first.
    in_flight: Vec<PendingSave>,
}

struct Inner {
    max_buffer_size: usize,
    state: Mutex<BufferState>,
    priority: Mutex<SegmentWriter>,
}

impl Inner {
    /// Claims a dispatched save for writing.
    ///
    /// Returns false if an urgent flush already folded it into the
    /// high-priority segment.
    fn claim(&self, save: &PendingSave) -> bool {
        self.state.lock().in_flight.iter().any(|s| s == save)
    }

    fn complete(&self, save: &PendingSave) {
        self.state.lock().in_flight.retain(|s| s != save);
    }
}

/// A sink that buffers records in memory and persists them to rotating
/// segment files.
///
/// # Flush policy
///
/// - A record above [`Severity::Warning`](logspool_codec::Severity::Warning)
///   flushes the buffer, together with every batch still waiting for the
///   background writer, to the high-priority segment before `log` returns
/// - Otherwise, once the buffer reaches `max_buffer_size` it is handed to
///   the background writer and cleared immediately
/// - Otherwise the record just waits in the buffer
///
/// Buffer swap-and-clear happens under the store's lock, so concurrent
/// `log` calls never lose or duplicate buffered records.
///
/// Dropping the store seals it and waits for the background writer to
/// finish. Segments a crashed run left outside the ledger are picked up
/// again when the store is next opened.
pub struct BufferingStore {
    inner: Arc<Inner>,
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    ledger: Arc<PendingLedger>,
    synchronizer: Option<Arc<FileSynchronizer>>,
    retry_loop: Option<RetryLoop>,
    standard_dir: PathBuf,
    priority_dir: PathBuf,
}

impl BufferingStore {
    /// Opens a store as described by `config`.
    ///
    /// With an upload configuration, closed segments are POSTed to the
    /// collector over any unmetered network; without one, at most
    /// `max_unsynced_files` closed segments are kept on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or locked, the
    /// HTTP client cannot be built, or the writer thread cannot start.
    pub fn open(config: StoreConfig) -> CoreResult<Self> {
        match &config.upload {
            Some(upload) => {
                let client = ReqwestClient::new(upload.timeout)?;
                let uploader = CollectorUploader::new(
                    upload.url.clone(),
                    client,
                    upload.network_policy,
                    Arc::new(AlwaysOnline),
                );
                Self::open_with_uploader(config, Arc::new(uploader))
            }
            None => {
                let ledger = open_ledger(&config)?;
                let archiver = Arc::new(CapacityCleaner::new(
                    Arc::clone(&ledger),
                    config.max_unsynced_files,
                ));
                Self::assemble(&config, ledger, archiver, None, Arc::new(TracingReporter))
            }
        }
    }

    /// Opens a store that uploads closed segments through `uploader`.
    ///
    /// Segments left pending by an earlier run are resubmitted immediately,
    /// and a retry loop re-submits failures in the background.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_uploader(config: StoreConfig, uploader: Arc<dyn Uploader>) -> CoreResult<Self> {
        let ledger = open_ledger(&config)?;
        let synchronizer = Arc::new(FileSynchronizer::new(
            Arc::clone(&ledger),
            uploader,
            config.upload_batch_size,
        ));
        synchronizer.sync_pending();

        let (interval, retry) = match &config.upload {
            Some(upload) => (upload.retry_interval, upload.retry.clone()),
            None => (Duration::from_secs(60), RetryConfig::default()),
        };
        let retry_loop = synchronizer.spawn_retry_loop(interval, retry)?;

        let mut store = Self::assemble(
            &config,
            ledger,
            Arc::clone(&synchronizer) as Arc<dyn SegmentArchiver>,
            Some(retry_loop),
            Arc::new(TracingReporter),
        )?;
        store.synchronizer = Some(synchronizer);
        Ok(store)
    }

    fn assemble(
        config: &StoreConfig,
        ledger: Arc<PendingLedger>,
        archiver: Arc<dyn SegmentArchiver>,
        retry_loop: Option<RetryLoop>,
        reporter: Arc<dyn FailureReporter>,
    ) -> CoreResult<Self> {
        let standard_dir = config.standard_dir();
        let priority_dir = config.priority_dir();

        let mut standard = SegmentWriter::new(
            FilenameSequencer::new(SegmentDir::open(&standard_dir)?, config.max_files),
            config.max_records_per_segment,
            Arc::clone(&archiver),
            Arc::clone(&reporter),
        );
        let priority = SegmentWriter::new(
            FilenameSequencer::new(SegmentDir::open(&priority_dir)?, config.max_files),
            config.max_records_per_segment,
            archiver,
            reporter,
        )
        .sync_on_write(config.sync_urgent_writes);

        standard.recover();
        priority.recover();

        let inner = Arc::new(Inner {
            max_buffer_size: config.max_buffer_size.max(1),
            state: Mutex::new(BufferState::default()),
            priority: Mutex::new(priority),
        });

        let (sender, receiver) = mpsc::channel::<Command>();
        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("logspool-writer".into())
            .spawn(move || {
                for command in receiver {
                    match command {
                        Command::Save(save) => {
                            if worker_inner.claim(&save) {
                                standard.write(save.records());
                                worker_inner.complete(&save);
                            } else {
                                debug!(records = save.len(), "save already written by urgent flush");
                            }
                        }
                        Command::Rotate(reply) => {
                            standard.rotate();
                            let _ = reply.send(());
                        }
                        Command::Barrier(reply) => {
                            let _ = reply.send(());
                        }
                    }
                }
            })?;

        Ok(Self {
            inner,
            sender: Some(sender),
            worker: Some(worker),
            ledger,
            synchronizer: None,
            retry_loop,
            standard_dir,
            priority_dir,
        })
    }

    /// Returns the directory of buffered-flush segments.
    pub fn standard_dir(&self) -> &Path {
        &self.standard_dir
    }

    /// Returns the directory of urgent-flush segments.
    pub fn priority_dir(&self) -> &Path {
        &self.priority_dir
    }

    /// Returns the pending-upload ledger.
    pub fn ledger(&self) -> &Arc<PendingLedger> {
        &self.ledger
    }

    /// Returns the synchronizer, if the store uploads.
    pub fn synchronizer(&self) -> Option<&Arc<FileSynchronizer>> {
        self.synchronizer.as_ref()
    }

    /// Returns the number of records waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    /// Returns the number of saves dispatched but not yet written.
    pub fn in_flight_saves(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Hands the current buffer to the background writer.
    pub fn flush(&self) {
        let save = {
            let mut state = self.inner.state.lock();
            if state.buffer.is_empty() {
                return;
            }
            let save = PendingSave::new(mem::take(&mut state.buffer));
            state.in_flight.push(save.clone());
            save
        };
        self.dispatch(save);
    }

    /// Blocks until every save dispatched so far has been written.
    pub fn wait_idle(&self) {
        self.round_trip(Command::Barrier);
    }

    /// Flushes, then closes both current segments and hands them to the
    /// archiver.
    ///
    /// Empty segments are left open.
    pub fn seal(&self) {
        self.flush();
        self.round_trip(Command::Rotate);
        self.inner.priority.lock().rotate();
    }

    fn round_trip(&self, command: impl FnOnce(Sender<()>) -> Command) {
        let (reply, done) = mpsc::channel();
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(command(reply)).is_ok() {
            let _ = done.recv();
        }
    }

    fn dispatch(&self, save: PendingSave) {
        let sent = self
            .sender
            .as_ref()
            .map(|sender| sender.send(Command::Save(save.clone())).is_ok())
            .unwrap_or(false);

        if !sent {
            warn!(records = save.len(), "background writer stopped; writing save directly");
            self.inner.priority.lock().write(save.records());
            self.inner.complete(&save);
        }
    }

    fn write_urgent(&self, mut state: parking_lot::MutexGuard<'_, BufferState>) {
        let mut records: Vec<Record> = state
            .in_flight
            .drain(..)
            .flat_map(|save| save.records().to_vec())
            .collect();
        records.append(&mut state.buffer);

        // Lock order is state, then priority. Taking the writer before
        // releasing the buffer keeps urgent batches in log order.
        let mut priority = self.inner.priority.lock();
        drop(state);
        priority.write(&records);
    }
}

impl Sink for BufferingStore {
    fn log(&self, record: Record) {
        let urgent = record.severity.is_urgent();

        let mut state = self.inner.state.lock();
        state.buffer.push(record);

        if urgent {
            self.write_urgent(state);
        } else if state.buffer.len() >= self.inner.max_buffer_size {
            let save = PendingSave::new(mem::take(&mut state.buffer));
            state.buffer.reserve(self.inner.max_buffer_size);
            state.in_flight.push(save.clone());
            drop(state);
            self.dispatch(save);
        }
    }
}

impl Drop for BufferingStore {
    fn drop(&mut self) {
        self.seal();
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("segment writer thread panicked");
            }
        }
        self.retry_loop.take();
    }
}

fn open_ledger(config: &StoreConfig) -> CoreResult<Arc<PendingLedger>> {
    let file = config.ledger_file();
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(PendingLedger::open(file)))
}
