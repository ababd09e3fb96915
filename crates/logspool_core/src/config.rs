//! Store and logger configuration.

use logspool_codec::Severity;
use logspool_sync::UploadConfig;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Configuration for opening a [`BufferingStore`](crate::BufferingStore).
///
/// The store lays out its root directory as:
///
/// ```text
/// <root>/
/// ├─ standard/                 # Segments written by buffered flushes
/// ├─ high-priority/            # Segments written by urgent flushes
/// └─ meta/pending-uploads.json # Closed segments awaiting upload
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory of the store.
    pub root: PathBuf,

    /// Buffered records that trigger a background flush.
    pub max_buffer_size: usize,

    /// Records per segment before rotation.
    pub max_records_per_segment: usize,

    /// Size of each directory's filename ring.
    pub max_files: u32,

    /// Segments submitted per upload pass.
    pub upload_batch_size: usize,

    /// Closed segments kept when no collector is configured.
    pub max_unsynced_files: usize,

    /// Whether every urgent write is followed by `fsync`.
    pub sync_urgent_writes: bool,

    /// Remote collector; `None` keeps segments local.
    pub upload: Option<UploadConfig>,
}

impl StoreConfig {
    /// Creates a configuration rooted at `root` with default values.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_buffer_size: 1000,
            max_records_per_segment: 10_000,
            max_files: 1000,
            upload_batch_size: 5,
            max_unsynced_files: 10,
            sync_urgent_writes: true,
            upload: None,
        }
    }

    /// Sets the buffer size that triggers a background flush.
    #[must_use]
    pub const fn max_buffer_size(mut self, value: usize) -> Self {
        self.max_buffer_size = value;
        self
    }

    /// Sets the per-segment record limit.
    #[must_use]
    pub const fn max_records_per_segment(mut self, value: usize) -> Self {
        self.max_records_per_segment = value;
        self
    }

    /// Sets the size of the filename ring.
    #[must_use]
    pub const fn max_files(mut self, value: u32) -> Self {
        self.max_files = value;
        self
    }

    /// Sets how many segments one upload pass submits.
    #[must_use]
    pub const fn upload_batch_size(mut self, value: usize) -> Self {
        self.upload_batch_size = value;
        self
    }

    /// Sets how many closed segments are kept without a collector.
    #[must_use]
    pub const fn max_unsynced_files(mut self, value: usize) -> Self {
        self.max_unsynced_files = value;
        self
    }

    /// Sets whether urgent writes are synced to disk.
    #[must_use]
    pub const fn sync_urgent_writes(mut self, value: bool) -> Self {
        self.sync_urgent_writes = value;
        self
    }

    /// Uploads closed segments to a collector.
    #[must_use]
    pub fn upload(mut self, upload: UploadConfig) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Directory of buffered-flush segments.
    #[must_use]
    pub fn standard_dir(&self) -> PathBuf {
        self.root.join("standard")
    }

    /// Directory of urgent-flush segments.
    #[must_use]
    pub fn priority_dir(&self) -> PathBuf {
        self.root.join("high-priority")
    }

    /// Path of the pending-upload ledger.
    #[must_use]
    pub fn ledger_file(&self) -> PathBuf {
        self.root.join("meta").join("pending-uploads.json")
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Identity stamped onto every record a [`Logger`](crate::Logger) emits.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Identifier of the application that owns the log.
    pub app_id: String,
    /// User events are attributed to.
    pub user_id: Option<Uuid>,
    /// Device events happen on.
    pub device_id: Option<Uuid>,
    /// Library logging on behalf of the application.
    pub framework_id: Option<String>,
    /// Category for loggers that do not set one.
    pub category: String,
    /// Records below this severity are dropped.
    pub min_severity: Severity,
}

impl LoggerConfig {
    /// Creates a configuration for `app_id` that keeps every severity.
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: None,
            device_id: None,
            framework_id: None,
            category: "common".to_string(),
            min_severity: Severity::Verbose,
        }
    }

    /// Sets the user id.
    #[must_use]
    pub fn user_id(mut self, id: Uuid) -> Self {
        self.user_id = Some(id);
        self
    }

    /// Sets the device id.
    #[must_use]
    pub fn device_id(mut self, id: Uuid) -> Self {
        self.device_id = Some(id);
        self
    }

    /// Marks records as emitted by a framework.
    #[must_use]
    pub fn framework_id(mut self, id: impl Into<String>) -> Self {
        self.framework_id = Some(id.into());
        self
    }

    /// Sets the default category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the minimum severity.
    #[must_use]
    pub const fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }
}
