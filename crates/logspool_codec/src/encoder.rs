//! Record and sequence encoder.

use crate::format::{COLUMN_COUNT, COLUMN_DELIMITER, EMPTY_FIELD, ESCAPE, ROW_DELIMITER};
use crate::parallel::map_ordered;
use crate::record::Record;
use std::borrow::Cow;

/// Escapes one text field so it contains no delimiter characters.
///
/// `ESCAPE` itself, the row delimiter and the column delimiter are replaced
/// by two-character placeholders. Empty text becomes [`EMPTY_FIELD`].
pub(crate) fn escape(field: &str) -> Cow<'_, str> {
    if field.is_empty() {
        return Cow::Borrowed(EMPTY_FIELD);
    }
    if !field.contains([ESCAPE, ROW_DELIMITER, COLUMN_DELIMITER]) {
        return Cow::Borrowed(field);
    }

    let mut out = String::with_capacity(field.len() + 8);
    for c in field.chars() {
        match c {
            ESCAPE => {
                out.push(ESCAPE);
                out.push('e');
            }
            ROW_DELIMITER => {
                out.push(ESCAPE);
                out.push('r');
            }
            COLUMN_DELIMITER => {
                out.push(ESCAPE);
                out.push('c');
            }
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn optional_text(field: Option<&str>) -> Cow<'_, str> {
    field.map_or(Cow::Borrowed(""), escape)
}

fn optional_number<N: ToString>(field: Option<N>) -> Cow<'static, str> {
    field.map_or(Cow::Borrowed(""), |n| Cow::Owned(n.to_string()))
}

/// Encodes one record as a column-delimited line.
///
/// Columns, in order: id, timestamp (ms), severity, message, category, file,
/// function, line, app id, user id, device id, custom data, thread id,
/// framework id. Absent optional values are zero-length columns.
#[must_use]
pub fn encode_record(record: &Record) -> String {
    let columns: [Cow<'_, str>; COLUMN_COUNT] = [
        optional_number(record.id),
        Cow::Owned(record.timestamp.as_millis().to_string()),
        Cow::Owned(record.severity.as_u8().to_string()),
        escape(&record.message),
        escape(&record.category),
        escape(&record.file),
        escape(&record.function),
        Cow::Owned(record.line.to_string()),
        escape(&record.app_id),
        optional_number(record.user_id.map(|u| u.hyphenated())),
        optional_number(record.device_id.map(|u| u.hyphenated())),
        optional_text(record.custom_data.as_deref()),
        optional_number(record.thread_id),
        optional_text(record.framework_id.as_deref()),
    ];

    let len = columns.iter().map(|c| c.len() + 1).sum();
    let mut out = String::with_capacity(len);
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push(COLUMN_DELIMITER);
        }
        out.push_str(column);
    }
    out
}

/// Encodes records as a sequence, each one prefixed by the row delimiter.
///
/// Large batches are encoded on several threads; output order always
/// matches input order.
#[must_use]
pub fn encode_records(records: &[Record]) -> String {
    let encoded = map_ordered(records, encode_record);

    let len = encoded.iter().map(|e| e.len() + ROW_DELIMITER.len_utf8()).sum();
    let mut out = String::with_capacity(len);
    for line in &encoded {
        out.push(ROW_DELIMITER);
        out.push_str(line);
    }
    out
}
