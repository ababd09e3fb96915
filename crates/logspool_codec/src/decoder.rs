//! Record, sequence and segment decoder.

use crate::error::{CodecResult, FormatError};
use crate::format::{
    SegmentHeader, COLUMN_COUNT, COLUMN_DELIMITER, EMPTY_FIELD, ESCAPE, ROW_DELIMITER,
};
use crate::parallel::map_ordered;
use crate::record::{Record, Severity, Timestamp};
use std::str::FromStr;
use uuid::Uuid;

/// Reverses [`crate::encoder::escape`].
pub(crate) fn unescape(column: &'static str, field: &str) -> CodecResult<String> {
    if field == EMPTY_FIELD {
        return Ok(String::new());
    }
    if !field.contains(ESCAPE) {
        return Ok(field.to_owned());
    }

    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('e') => out.push(ESCAPE),
            Some('r') => out.push(ROW_DELIMITER),
            Some('c') => out.push(COLUMN_DELIMITER),
            _ => return Err(FormatError::invalid_field(column, field)),
        }
    }
    Ok(out)
}

fn required_text(column: &'static str, field: &str) -> CodecResult<String> {
    if field.is_empty() {
        return Err(FormatError::MissingField { column });
    }
    unescape(column, field)
}

fn optional_text(column: &'static str, field: &str) -> CodecResult<Option<String>> {
    if field.is_empty() {
        return Ok(None);
    }
    unescape(column, field).map(Some)
}

fn required_parse<T: FromStr>(column: &'static str, field: &str) -> CodecResult<T> {
    if field.is_empty() {
        return Err(FormatError::MissingField { column });
    }
    field
        .parse()
        .map_err(|_| FormatError::invalid_field(column, field))
}

fn optional_parse<T: FromStr>(column: &'static str, field: &str) -> CodecResult<Option<T>> {
    if field.is_empty() {
        return Ok(None);
    }
    required_parse(column, field).map(Some)
}

/// Decodes one record produced by [`crate::encode_record`].
///
/// # Errors
///
/// Returns [`FormatError::ColumnCount`] when the column count differs from the
/// current layout, [`FormatError::UnknownSeverity`] for an unrecognised level,
/// and [`FormatError::InvalidField`] / [`FormatError::MissingField`] for
/// unparsable columns.
pub fn decode_record(text: &str) -> CodecResult<Record> {
    let columns: Vec<&str> = text.split(COLUMN_DELIMITER).collect();
    if columns.len() != COLUMN_COUNT {
        return Err(FormatError::ColumnCount {
            expected: COLUMN_COUNT,
            actual: columns.len(),
        });
    }

    let raw_severity: u8 = required_parse("severity", columns[2])?;
    let severity =
        Severity::from_u8(raw_severity).ok_or(FormatError::UnknownSeverity(raw_severity))?;

    Ok(Record {
        id: optional_parse("id", columns[0])?,
        timestamp: Timestamp::from_millis(required_parse("timestamp", columns[1])?),
        severity,
        message: required_text("message", columns[3])?,
        category: required_text("category", columns[4])?,
        file: required_text("file", columns[5])?,
        function: required_text("function", columns[6])?,
        line: required_parse("line", columns[7])?,
        app_id: required_text("app_id", columns[8])?,
        user_id: optional_parse::<Uuid>("user_id", columns[9])?,
        device_id: optional_parse::<Uuid>("device_id", columns[10])?,
        custom_data: optional_text("custom_data", columns[11])?,
        thread_id: optional_parse("thread_id", columns[12])?,
        framework_id: optional_text("framework_id", columns[13])?,
    })
}

/// Decodes a sequence produced by [`crate::encode_records`].
///
/// Records are decoded in parallel for large inputs and returned in the
/// order they appear in the text.
///
/// # Errors
///
/// Returns [`FormatError::MissingRowDelimiter`] if non-empty text does not start
/// with the row delimiter, or the first error from [`decode_record`].
pub fn decode_records(text: &str) -> CodecResult<Vec<Record>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = text.split(ROW_DELIMITER);
    if rows.next() != Some("") {
        return Err(FormatError::MissingRowDelimiter);
    }

    let rows: Vec<&str> = rows.collect();
    map_ordered(&rows, |row| decode_record(row))
        .into_iter()
        .collect()
}

/// Decodes a whole segment: the header line followed by a record sequence.
///
/// # Errors
///
/// Returns header errors ([`FormatError::InvalidHeader`],
/// [`FormatError::UnsupportedVersion`]) or record errors.
pub fn decode_segment(text: &str) -> CodecResult<(SegmentHeader, Vec<Record>)> {
    let (header, body) = match text.find(ROW_DELIMITER) {
        Some(idx) => text.split_at(idx),
        None => (text, ""),
    };
    let header = SegmentHeader::decode(header)?;
    let records = decode_records(body)?;
    Ok((header, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_record, encode_records, escape};

    fn full_record() -> Record {
        Record::new(Severity::Warning, "disk nearly full")
            .with_id(42)
            .with_timestamp(Timestamp::from_millis(1_700_000_000_123))
            .with_category("storage")
            .with_source("src/disk.rs", "check_space", 88)
            .with_app_id("com.example.app")
            .with_user_id(Uuid::new_v4())
            .with_device_id(Uuid::new_v4())
            .with_custom_data("{\"free\":12}")
            .with_thread_id(7)
            .with_framework_id("com.example.kit")
    }

    #[test]
    fn unescape_reverses_escape() {
        let raw = format!("x{ROW_DELIMITER}{COLUMN_DELIMITER}{ESCAPE}y{ESCAPE}0");
        assert_eq!(unescape("message", &escape(&raw)).unwrap(), raw);
        assert_eq!(unescape("message", &escape("")).unwrap(), "");
    }

    #[test]
    fn unescape_rejects_dangling_escape() {
        let bad = format!("abc{ESCAPE}");
        assert!(unescape("message", &bad).is_err());
        let bad = format!("abc{ESCAPE}q");
        assert!(unescape("message", &bad).is_err());
    }

    #[test]
    fn full_record_roundtrip() {
        let record = full_record();
        assert_eq!(decode_record(&encode_record(&record)).unwrap(), record);
    }

    #[test]
    fn empty_and_absent_stay_distinct() {
        let empty = Record::new(Severity::Info, "")
            .with_custom_data("")
            .with_framework_id("");
        let decoded = decode_record(&encode_record(&empty)).unwrap();
        assert_eq!(decoded.message, "");
        assert_eq!(decoded.custom_data.as_deref(), Some(""));
        assert_eq!(decoded.framework_id.as_deref(), Some(""));

        let absent = Record::new(Severity::Info, "x");
        let decoded = decode_record(&encode_record(&absent)).unwrap();
        assert_eq!(decoded.custom_data, None);
        assert_eq!(decoded.framework_id, None);
    }

    #[test]
    fn column_count_mismatch_fails() {
        let line = encode_record(&full_record());
        let truncated: Vec<&str> = line.split(COLUMN_DELIMITER).take(COLUMN_COUNT - 1).collect();
        let truncated = truncated.join(&COLUMN_DELIMITER.to_string());

        assert_eq!(
            decode_record(&truncated).unwrap_err(),
            FormatError::ColumnCount {
                expected: COLUMN_COUNT,
                actual: COLUMN_COUNT - 1
            }
        );
    }

    #[test]
    fn unknown_severity_fails() {
        let line = encode_record(&full_record());
        let mut columns: Vec<&str> = line.split(COLUMN_DELIMITER).collect();
        columns[2] = "35";
        let line = columns.join(&COLUMN_DELIMITER.to_string());

        assert_eq!(
            decode_record(&line).unwrap_err(),
            FormatError::UnknownSeverity(35)
        );
    }

    #[test]
    fn invalid_number_fails() {
        let line = encode_record(&full_record());
        let mut columns: Vec<&str> = line.split(COLUMN_DELIMITER).collect();
        columns[7] = "eighty-eight";
        let line = columns.join(&COLUMN_DELIMITER.to_string());

        assert!(matches!(
            decode_record(&line).unwrap_err(),
            FormatError::InvalidField { column: "line", .. }
        ));
    }

    #[test]
    fn sequence_roundtrip_keeps_order() {
        let records: Vec<Record> = (0..1000)
            .map(|i| Record::new(Severity::Debug, format!("message {i}")).with_source("f.rs", "f", i))
            .collect();
        let decoded = decode_records(&encode_records(&records)).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn sequence_without_leading_delimiter_fails() {
        let text = encode_record(&full_record());
        assert_eq!(
            decode_records(&text).unwrap_err(),
            FormatError::MissingRowDelimiter
        );
    }

    #[test]
    fn segment_with_header_only() {
        let header = SegmentHeader::current();
        let (decoded, records) = decode_segment(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert!(records.is_empty());
    }

    #[test]
    fn segment_roundtrip() {
        let records = vec![full_record(), Record::new(Severity::Fatal, "boom")];
        let text = SegmentHeader::current().encode() + &encode_records(&records);
        let (_, decoded) = decode_segment(&text).unwrap();
        assert_eq!(decoded, records);
    }
}
