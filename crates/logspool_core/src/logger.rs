//! The logging facade applications call.

use crate::config::LoggerConfig;
use crate::error::{CoreError, CoreResult};
use crate::sink::Sink;
use logspool_codec::{Record, Severity};
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Logger> = OnceLock::new();

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Small, stable, process-unique id for the calling thread.
fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Stamps records with identity and source location and hands them to a
/// sink.
///
/// Loggers are cheap to clone; [`with_category`](Self::with_category)
/// derives one that shares the same sink.
///
/// File and line come from `#[track_caller]`. Rust exposes no caller
/// function name at runtime, so the function field is empty unless a
/// logger is scoped with [`in_function`](Self::in_function).
///
/// ```
/// use logspool_codec::Record;
/// use logspool_core::{Logger, LoggerConfig, Sink};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Collect(Mutex<Vec<Record>>);
/// impl Sink for Collect {
///     fn log(&self, record: Record) {
///         self.0.lock().unwrap().push(record);
///     }
/// }
///
/// let sink = Arc::new(Collect::default());
/// let log = Logger::new(LoggerConfig::new("com.example.app"), sink.clone());
/// log.with_category("auth").info("user signed in");
///
/// let records = sink.0.lock().unwrap();
/// assert_eq!(records[0].category, "auth");
/// assert_eq!(records[0].app_id, "com.example.app");
/// ```
#[derive(Clone)]
pub struct Logger {
    config: Arc<LoggerConfig>,
    category: String,
    function: String,
    sink: Arc<dyn Sink>,
}

impl Logger {
    /// Creates a logger writing to `sink`.
    pub fn new(config: LoggerConfig, sink: Arc<dyn Sink>) -> Self {
        let category = config.category.clone();
        Self {
            config: Arc::new(config),
            category,
            function: String::new(),
            sink,
        }
    }

    /// Installs the process-wide logger.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyConfigured`] on every call after the
    /// first; the installed logger is left unchanged.
    pub fn configure(config: LoggerConfig, sink: Arc<dyn Sink>) -> CoreResult<&'static Logger> {
        let mut installed = false;
        let logger = GLOBAL.get_or_init(|| {
            installed = true;
            Logger::new(config, sink)
        });
        if installed {
            Ok(logger)
        } else {
            Err(CoreError::AlreadyConfigured)
        }
    }

    /// Returns the process-wide logger.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotConfigured`] before [`configure`](Self::configure).
    pub fn global() -> CoreResult<&'static Logger> {
        GLOBAL.get().ok_or(CoreError::NotConfigured)
    }

    /// Returns a logger for `category` sharing this logger's sink.
    #[must_use]
    pub fn with_category(&self, category: impl Into<String>) -> Logger {
        Logger {
            config: Arc::clone(&self.config),
            category: category.into(),
            function: self.function.clone(),
            sink: Arc::clone(&self.sink),
        }
    }

    /// Returns a logger that stamps `function` as the source function.
    #[must_use]
    pub fn in_function(&self, function: impl Into<String>) -> Logger {
        Logger {
            function: function.into(),
            ..self.clone()
        }
    }

    /// Returns the category stamped on records.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Returns true if records at `severity` are kept.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.config.min_severity
    }

    /// Builds the record `log` would emit, without emitting it.
    #[track_caller]
    pub fn record(&self, severity: Severity, message: impl Into<String>) -> Record {
        self.stamp(severity, message.into(), None, Location::caller())
    }

    fn stamp(
        &self,
        severity: Severity,
        message: String,
        custom_data: Option<String>,
        location: &Location<'_>,
    ) -> Record {
        let mut record = Record::new(severity, message)
            .with_category(self.category.clone())
            .with_source(location.file(), self.function.clone(), location.line())
            .with_app_id(self.config.app_id.clone())
            .with_thread_id(current_thread_id());
        record.user_id = self.config.user_id;
        record.device_id = self.config.device_id;
        record.framework_id = self.config.framework_id.clone();
        record.custom_data = custom_data;
        record
    }

    fn emit(&self, severity: Severity, message: String, custom_data: Option<String>, location: &Location<'_>) {
        if self.enabled(severity) {
            self.sink
                .log(self.stamp(severity, message, custom_data, location));
        }
    }

    /// Logs `message` at `severity`.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        self.emit(severity, message.into(), None, Location::caller());
    }

    /// Logs `message` at `severity` with a caller-defined payload.
    #[track_caller]
    pub fn log_with_data(
        &self,
        severity: Severity,
        message: impl Into<String>,
        custom_data: impl Into<String>,
    ) {
        self.emit(
            severity,
            message.into(),
            Some(custom_data.into()),
            Location::caller(),
        );
    }

    /// Extra information, such as entering or leaving low-level functions.
    #[track_caller]
    pub fn verbose(&self, message: impl Into<String>) {
        self.emit(Severity::Verbose, message.into(), None, Location::caller());
    }

    /// Details describing what went wrong and why.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Severity::Debug, message.into(), None, Location::caller());
    }

    /// General information, such as user interactions.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, message.into(), None, Location::caller());
    }

    /// An unfortunate but recoverable state.
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Severity::Warning, message.into(), None, Location::caller());
    }

    /// An unrecoverable state. Reaches disk before this returns when the
    /// sink is a [`BufferingStore`](crate::BufferingStore).
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Severity::Error, message.into(), None, Location::caller());
    }

    /// A state that should not be possible.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) {
        self.emit(Severity::Fatal, message.into(), None, Location::caller());
    }
}
