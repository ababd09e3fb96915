//! Record fixtures and directory helpers.

use logspool_codec::{Record, Severity, Timestamp};
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

/// Fixed timestamp used by every fixture, 2024-01-01T00:00:00Z.
pub const FIXTURE_EPOCH_MS: u64 = 1_704_067_200_000;

/// Builds a fully populated, non-urgent record.
///
/// Fields are derived from `n` so records compare unequal.
pub fn sample_record(n: usize) -> Record {
    Record::new(Severity::Info, format!("sample record {n}"))
        .with_timestamp(Timestamp::from_millis(FIXTURE_EPOCH_MS + n as u64))
        .with_category("fixture")
        .with_source("fixtures.rs", "sample_record", n as u32)
        .with_app_id("com.example.app")
        .with_user_id(Uuid::from_u128(0x1111))
        .with_device_id(Uuid::from_u128(0x2222))
        .with_thread_id(1)
}

/// Builds `count` sample records numbered from zero.
pub fn sample_records(count: usize) -> Vec<Record> {
    (0..count).map(sample_record).collect()
}

/// Builds a record with the given severity.
pub fn record_with_severity(severity: Severity, message: &str) -> Record {
    Record::new(severity, message).with_timestamp(Timestamp::from_millis(FIXTURE_EPOCH_MS))
}

/// Builds an urgent record, one that bypasses buffering.
pub fn urgent_record(message: &str) -> Record {
    record_with_severity(Severity::Error, message)
}

/// Creates a temporary directory, panicking on failure.
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Lists the numbered segment files in `dir`, sorted by index.
pub fn segment_files(dir: &Path) -> Vec<u32> {
    let mut indices: Vec<u32> = std::fs::read_dir(dir)
        .expect("Failed to read segment directory")
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
        .collect();
    indices.sort_unstable();
    indices
}
