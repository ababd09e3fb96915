//! Table layout and row mapping.

use logspool_codec::{FormatError, Record, Severity, Timestamp};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Creates the tables if they do not exist.
pub(crate) const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS records (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp    INTEGER NOT NULL,
    severity     INTEGER NOT NULL,
    message      TEXT    NOT NULL,
    category     TEXT    NOT NULL,
    file         TEXT    NOT NULL,
    function     TEXT    NOT NULL,
    line         INTEGER NOT NULL,
    app_id       TEXT    NOT NULL,
    user_id      TEXT,
    device_id    TEXT,
    custom_data  TEXT,
    thread_id    INTEGER,
    framework_id TEXT
);
CREATE TABLE IF NOT EXISTS sync_cursor (
    id        INTEGER NOT NULL,
    timestamp INTEGER NOT NULL
);
";

pub(crate) const INSERT_RECORD: &str = "
INSERT INTO records (
    timestamp, severity, message, category, file, function, line,
    app_id, user_id, device_id, custom_data, thread_id, framework_id
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
";

const COLUMNS: &str = "id, timestamp, severity, message, category, file, function, line, \
                       app_id, user_id, device_id, custom_data, thread_id, framework_id";

/// The cursor row always has rowid 1.
pub(crate) const SELECT_CURSOR: &str = "SELECT id, timestamp FROM sync_cursor WHERE rowid = 1";

pub(crate) const UPSERT_CURSOR: &str =
    "INSERT OR REPLACE INTO sync_cursor (rowid, id, timestamp) VALUES (1, ?1, ?2)";

pub(crate) fn select_after_cursor() -> String {
    format!(
        "SELECT {COLUMNS} FROM records \
         WHERE id > COALESCE((SELECT id FROM sync_cursor WHERE rowid = 1), 0) \
         ORDER BY id ASC LIMIT ?1"
    )
}

pub(crate) fn select_from() -> String {
    format!("SELECT {COLUMNS} FROM records WHERE id >= ?1 ORDER BY id ASC LIMIT ?2")
}

/// SQLite integers are signed; unsigned values are stored bit-for-bit.
pub(crate) fn to_sql_u64(value: u64) -> i64 {
    value as i64
}

pub(crate) fn from_sql_u64(value: i64) -> u64 {
    value as u64
}

pub(crate) fn insert(conn: &Connection, record: &Record) -> rusqlite::Result<i64> {
    let mut stmt = conn.prepare_cached(INSERT_RECORD)?;
    stmt.execute(params![
        to_sql_u64(record.timestamp.as_millis()),
        i64::from(record.severity.as_u8()),
        record.message,
        record.category,
        record.file,
        record.function,
        i64::from(record.line),
        record.app_id,
        record.user_id.map(|u| u.to_string()),
        record.device_id.map(|u| u.to_string()),
        record.custom_data,
        record.thread_id.map(to_sql_u64),
        record.framework_id,
    ])?;
    Ok(conn.last_insert_rowid())
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| {
            Uuid::parse_str(&text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

pub(crate) fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let raw_severity: i64 = row.get(2)?;
    let severity = u8::try_from(raw_severity)
        .ok()
        .and_then(Severity::from_u8)
        .ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Integer,
                Box::new(FormatError::UnknownSeverity(raw_severity as u8)),
            )
        })?;

    Ok(Record {
        id: Some(from_sql_u64(row.get(0)?)),
        timestamp: Timestamp::from_millis(from_sql_u64(row.get(1)?)),
        severity,
        message: row.get(3)?,
        category: row.get(4)?,
        file: row.get(5)?,
        function: row.get(6)?,
        line: row.get(7)?,
        app_id: row.get(8)?,
        user_id: uuid_column(row, 9)?,
        device_id: uuid_column(row, 10)?,
        custom_data: row.get(11)?,
        thread_id: row.get::<_, Option<i64>>(12)?.map(from_sql_u64),
        framework_id: row.get(13)?,
    })
}
