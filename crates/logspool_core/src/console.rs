//! A sink that prints records.

use crate::sink::Sink;
use logspool_codec::Record;
use parking_lot::Mutex;
use std::io::{self, Stdout, Write};

/// Writes one human-readable line per record.
///
/// ```text
/// 1704067200000 [error] net http.rs:42 connection reset
/// ```
pub struct ConsoleSink<W: Write + Send = Stdout> {
    out: Mutex<W>,
}

impl ConsoleSink<Stdout> {
    /// Prints to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Prints to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

/// Formats a record as a single line, without the trailing newline.
pub fn format_line(record: &Record) -> String {
    let mut line = format!(
        "{} [{}] {} {}:{} {}",
        record.timestamp.as_millis(),
        record.severity,
        record.category,
        record.file,
        record.line,
        record.message
    );
    if let Some(data) = &record.custom_data {
        line.push_str(" | ");
        line.push_str(data);
    }
    line
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn log(&self, record: Record) {
        let line = format_line(&record);
        let mut out = self.out.lock();
        // Nowhere left to report a failing console.
        let _ = writeln!(out, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logspool_codec::{Severity, Timestamp};

    #[test]
    fn formats_one_line() {
        let record = Record::new(Severity::Error, "connection reset")
            .with_timestamp(Timestamp::from_millis(1_704_067_200_000))
            .with_category("net")
            .with_source("http.rs", "send", 42);

        assert_eq!(
            format_line(&record),
            "1704067200000 [error] net http.rs:42 connection reset"
        );
    }

    #[test]
    fn custom_data_is_appended() {
        let record = Record::new(Severity::Info, "m")
            .with_timestamp(Timestamp::from_millis(1))
            .with_custom_data("k=v");
        assert!(format_line(&record).ends_with(" | k=v"));
    }

    #[test]
    fn writes_to_inner_writer() {
        let sink = ConsoleSink::new(Vec::new());
        sink.log(Record::new(Severity::Info, "first"));
        sink.log(Record::new(Severity::Info, "second"));

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("second"));
    }
}
