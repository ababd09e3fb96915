//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records that exercise the codec's
//! escaping as well as ordinary text.

use logspool_codec::{Record, Severity, Timestamp, COLUMN_DELIMITER, ROW_DELIMITER};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for generating any severity.
pub fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

/// Strategy for generating severities that are buffered.
pub fn buffered_severity_strategy() -> impl Strategy<Value = Severity> {
    prop::sample::select(
        Severity::ALL
            .iter()
            .copied()
            .filter(|s| !s.is_urgent())
            .collect::<Vec<_>>(),
    )
}

/// Strategy for generating message text, biased toward delimiter
/// characters and empty strings.
pub fn message_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => any::<char>(),
            1 => Just(ROW_DELIMITER),
            1 => Just(COLUMN_DELIMITER),
            1 => Just('\u{10}'),
        ],
        0..32,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for generating a record with a random subset of optional
/// fields populated and no database id.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        any::<u64>(),
        severity_strategy(),
        message_strategy(),
        "[a-z]{0,12}",
        any::<u32>(),
        prop::option::of(any::<u128>()),
        prop::option::of(message_strategy()),
        prop::option::of(any::<u64>()),
    )
        .prop_map(
            |(millis, severity, message, category, line, user, custom_data, thread_id)| {
                let mut record = Record::new(severity, message)
                    .with_timestamp(Timestamp::from_millis(millis))
                    .with_category(category)
                    .with_source("gen.rs", "record_strategy", line);
                record.user_id = user.map(Uuid::from_u128);
                record.custom_data = custom_data;
                record.thread_id = thread_id;
                record
            },
        )
}

/// Strategy for generating a batch of records.
pub fn records_strategy(max: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), 0..max)
}
