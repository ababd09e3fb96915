//! The log record value type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// How bad a logged event is.
///
/// Levels are ordered; anything above [`Severity::Warning`] is urgent and
/// bypasses the write buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    /// Extra information, such as entering or leaving low-level functions.
    Verbose = 10,
    /// Details describing what went wrong and why.
    Debug = 20,
    /// General information, such as user interactions.
    Info = 30,
    /// An unfortunate but recoverable state.
    Warning = 40,
    /// An unrecoverable state.
    Error = 50,
    /// A state that should not be possible.
    Fatal = 60,
}

impl Severity {
    /// All levels in ascending order.
    pub const ALL: [Severity; 6] = [
        Severity::Verbose,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Returns the wire value of this level.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            10 => Some(Severity::Verbose),
            20 => Some(Severity::Debug),
            30 => Some(Severity::Info),
            40 => Some(Severity::Warning),
            50 => Some(Severity::Error),
            60 => Some(Severity::Fatal),
            _ => None,
        }
    }

    /// Returns true for levels that must reach disk before `log` returns.
    #[must_use]
    pub fn is_urgent(self) -> bool {
        self > Severity::Warning
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Verbose => "verbose",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Returns milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// One structured log entry.
///
/// Records are plain values. The `id` is absent until a store that assigns
/// identifiers (the embedded database) has persisted the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier, unique and increasing within one store.
    pub id: Option<u64>,
    /// When the event happened.
    pub timestamp: Timestamp,
    /// How bad the event is.
    pub severity: Severity,
    /// Human readable message.
    pub message: String,
    /// Free-form grouping label.
    pub category: String,
    /// Source file that emitted the record.
    pub file: String,
    /// Function that emitted the record.
    pub function: String,
    /// Source line that emitted the record.
    pub line: u32,
    /// Identifier of the application that owns the log.
    pub app_id: String,
    /// User the event is attributed to.
    pub user_id: Option<Uuid>,
    /// Device the event happened on.
    pub device_id: Option<Uuid>,
    /// Caller-defined payload.
    pub custom_data: Option<String>,
    /// OS thread that emitted the record.
    pub thread_id: Option<u64>,
    /// Library that emitted the record on behalf of the application.
    pub framework_id: Option<String>,
}

impl Record {
    /// Creates a record stamped with the current time.
    ///
    /// All other fields start empty and are filled in with the `with_*`
    /// builders.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: Timestamp::now(),
            severity,
            message: message.into(),
            category: String::new(),
            file: String::new(),
            function: String::new(),
            line: 0,
            app_id: String::new(),
            user_id: None,
            device_id: None,
            custom_data: None,
            thread_id: None,
            framework_id: None,
        }
    }

    /// Sets the store-assigned identifier.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the category label.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_source(mut self, file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.function = function.into();
        self.line = line;
        self
    }

    /// Sets the originating application.
    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the device id.
    #[must_use]
    pub fn with_device_id(mut self, device_id: Uuid) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Sets the custom data payload.
    #[must_use]
    pub fn with_custom_data(mut self, data: impl Into<String>) -> Self {
        self.custom_data = Some(data.into());
        self
    }

    /// Sets the thread id.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: u64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Sets the owning framework.
    #[must_use]
    pub fn with_framework_id(mut self, framework_id: impl Into<String>) -> Self {
        self.framework_id = Some(framework_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn severity_wire_values() {
        for level in Severity::ALL {
            assert_eq!(Severity::from_u8(level.as_u8()), Some(level));
        }
        assert_eq!(Severity::from_u8(0), None);
        assert_eq!(Severity::from_u8(35), None);
    }

    #[test]
    fn only_error_and_fatal_are_urgent() {
        assert!(!Severity::Verbose.is_urgent());
        assert!(!Severity::Warning.is_urgent());
        assert!(Severity::Error.is_urgent());
        assert!(Severity::Fatal.is_urgent());
    }

    #[test]
    fn builder_sets_fields() {
        let user = Uuid::new_v4();
        let record = Record::new(Severity::Info, "hello")
            .with_category("net")
            .with_source("main.rs", "main", 7)
            .with_app_id("com.example.app")
            .with_user_id(user)
            .with_thread_id(3);

        assert_eq!(record.message, "hello");
        assert_eq!(record.category, "net");
        assert_eq!(record.line, 7);
        assert_eq!(record.user_id, Some(user));
        assert_eq!(record.thread_id, Some(3));
        assert_eq!(record.id, None);
    }

    #[test]
    fn timestamp_now_is_after_2020() {
        assert!(Timestamp::now().as_millis() > 1_577_836_800_000);
    }
}
