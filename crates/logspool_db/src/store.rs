//! SQLite-backed record store.

use crate::error::{DbError, DbResult};
use crate::schema::{self, from_sql_u64, to_sql_u64};
use logspool_codec::{Record, Timestamp};
use logspool_core::Sink;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The last record id a consumer has durably delivered elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCursor {
    /// Highest delivered record id.
    pub last_synced_id: u64,
    /// When the cursor was last advanced.
    pub timestamp: Timestamp,
}

/// A row-oriented alternative to segment files.
///
/// Records are inserted into one table with store-assigned, strictly
/// increasing ids. Consumers pull batches after the sync cursor with
/// [`get_sync_batch`](Self::get_sync_batch) and advance the cursor with
/// [`set_last_synced_id`](Self::set_last_synced_id) once they have
/// delivered them.
///
/// # Failure policy
///
/// Any engine failure means the store can no longer be trusted and should
/// be treated as fatal by the caller. The inherent methods report it as a
/// [`DbError`] and leave the decision to abort to the host application;
/// logging through the [`Sink`] impl has nowhere to return it, so a failed
/// insert there panics.
pub struct EmbeddedStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl EmbeddedStore {
    /// Opens (creating if needed) `<dir>/<name>.sqlite` and connects.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened and initialised.
    pub fn open(dir: &Path, name: &str) -> DbResult<Self> {
        fs::create_dir_all(dir)?;
        let store = Self {
            path: dir.join(format!("{name}.sqlite")),
            conn: Mutex::new(None),
        };
        store.connect()?;
        Ok(store)
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the connection and creates missing tables.
    ///
    /// Connecting an already connected store does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialised.
    pub fn connect(&self) -> DbResult<()> {
        let mut guard = self.conn.lock();
        if guard.is_some() {
            return Ok(());
        }

        let conn = Connection::open(&self.path)?;
        conn.execute_batch(schema::CREATE_TABLES)?;
        debug!(path = %self.path.display(), "embedded log store connected");
        *guard = Some(conn);
        Ok(())
    }

    /// Closes the connection. Disconnecting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to close cleanly.
    pub fn disconnect(&self) -> DbResult<()> {
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| DbError::Sqlite(e))?;
        debug!(path = %self.path.display(), "embedded log store disconnected");
        Ok(())
    }

    /// Returns true while connected.
    pub fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(DbError::NotConnected)?;
        f(conn)
    }

    /// Inserts one record and returns its assigned id.
    ///
    /// Any `id` already on the record is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnected or the insert fails.
    pub fn insert(&self, record: &Record) -> DbResult<u64> {
        self.with_conn(|conn| Ok(from_sql_u64(schema::insert(conn, record)?)))
    }

    /// Returns up to `max` records after the sync cursor, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnected or the query fails.
    pub fn get_sync_batch(&self, max: usize) -> DbResult<Vec<Record>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&schema::select_after_cursor())?;
            let rows = stmt.query_map(params![limit(max)], schema::record_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Returns up to `max` records with id `>= first_id`, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnected or the query fails.
    pub fn records_from(&self, first_id: u64, max: usize) -> DbResult<Vec<Record>> {
        self.with_conn(|conn| {
            // No stored id can be that large.
            let Ok(first_id) = i64::try_from(first_id) else {
                return Ok(Vec::new());
            };
            let mut stmt = conn.prepare_cached(&schema::select_from())?;
            let rows = stmt.query_map(
                params![first_id, limit(max)],
                schema::record_from_row,
            )?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Returns the sync cursor, if it was ever set.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnected or the query fails.
    pub fn last_synced(&self) -> DbResult<Option<SyncCursor>> {
        self.with_conn(|conn| read_cursor(conn))
    }

    /// Advances the sync cursor to `id`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::CursorRegression`] if `id` is below the stored
    /// cursor, [`DbError::IdOutOfRange`] if `id` exceeds `i64::MAX`, or an
    /// error if disconnected or the write fails.
    pub fn set_last_synced_id(&self, id: u64) -> DbResult<()> {
        let sql_id = i64::try_from(id).map_err(|_| DbError::IdOutOfRange(id))?;
        self.with_conn(|conn| {
            if let Some(current) = read_cursor(conn)? {
                if id < current.last_synced_id {
                    return Err(DbError::CursorRegression {
                        current: current.last_synced_id,
                        requested: id,
                    });
                }
            }

            let mut stmt = conn.prepare_cached(schema::UPSERT_CURSOR)?;
            stmt.execute(params![
                sql_id,
                to_sql_u64(Timestamp::now().as_millis())
            ])?;
            Ok(())
        })
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnected or the query fails.
    pub fn count(&self) -> DbResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(from_sql_u64(count))
        })
    }
}

fn read_cursor(conn: &Connection) -> DbResult<Option<SyncCursor>> {
    let mut stmt = conn.prepare_cached(schema::SELECT_CURSOR)?;
    let cursor = stmt
        .query_row([], |row| {
            Ok(SyncCursor {
                last_synced_id: from_sql_u64(row.get(0)?),
                timestamp: Timestamp::from_millis(from_sql_u64(row.get(1)?)),
            })
        })
        .optional()?;
    Ok(cursor)
}

fn limit(max: usize) -> i64 {
    i64::try_from(max).unwrap_or(i64::MAX)
}

impl Sink for EmbeddedStore {
    fn log(&self, record: Record) {
        if let Err(e) = self.insert(&record) {
            panic!("embedded log store at {} failed to persist a record: {e}", self.path.display());
        }
    }
}

impl Drop for EmbeddedStore {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(error = %e, "failed to close embedded log store");
            }
        }
    }
}
