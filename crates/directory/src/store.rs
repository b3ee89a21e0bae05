use crate::error::{DirectoryError, Result};
use crate::phone::{lookup_candidates, normalize_key};
use crate::record::CallerRecord;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Layout version stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 2;

/// Read-only connections opened next to the writer for file databases.
pub const READ_POOL_SIZE: usize = 4;

const DB_FILE_NAME: &str = "caller_directory.db";

const RECORD_COLUMNS: &str = "phone_number, country_code, name, appointment, city, ios_row";

/// SQLite-backed caller directory.
///
/// Writes go through a single writer connection, one statement or
/// transaction at a time. File databases run in WAL mode with a small pool
/// of read-only connections, so lookups see the last committed state and
/// never wait on the writer. In-memory stores share the writer for reads.
pub struct DirectoryStore {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_cursor: AtomicUsize,
}

impl DirectoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;
        let mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(journal_mode = %mode, "caller directory is not in WAL mode");
        }

        let mut store = Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            read_cursor: AtomicUsize::new(0),
        };
        store.init_schema()?;

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        for _ in 0..READ_POOL_SIZE {
            let reader = Connection::open_with_flags(path, flags)?;
            store.readers.push(Mutex::new(reader));
        }

        tracing::debug!(
            path = %path.display(),
            readers = store.readers.len(),
            "caller directory opened"
        );
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            writer: Mutex::new(Connection::open_in_memory()?),
            readers: Vec::new(),
            read_cursor: AtomicUsize::new(0),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// `<data_dir>/callmark/caller_directory.db`, if the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("callmark").join(DB_FILE_NAME))
    }

    /// Creates the table, rebuilding it when the stored layout version differs.
    fn init_schema(&self) -> Result<()> {
        let conn = self.writer.lock().expect("database mutex poisoned");
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version != 0 && version != SCHEMA_VERSION {
            tracing::warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "caller directory layout mismatch, rebuilding"
            );
            conn.execute_batch("DROP TABLE IF EXISTS caller_info;")?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS caller_info (
                phone_number TEXT PRIMARY KEY NOT NULL,
                country_code TEXT NOT NULL,
                name TEXT NOT NULL,
                appointment TEXT NOT NULL,
                city TEXT NOT NULL,
                ios_row TEXT NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// An idle reader if there is one, otherwise the next in turn.
    fn reader(&self) -> MutexGuard<'_, Connection> {
        if self.readers.is_empty() {
            return self.writer.lock().expect("database mutex poisoned");
        }

        for conn in &self.readers {
            if let Ok(guard) = conn.try_lock() {
                return guard;
            }
        }

        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[index].lock().expect("database mutex poisoned")
    }

    /// Inserts or fully replaces the record for its phone number.
    pub fn upsert(&self, record: &CallerRecord) -> Result<()> {
        let key = storage_key(record)?;
        let conn = self.writer.lock().expect("database mutex poisoned");
        insert_record(&conn, key, record)
    }

    /// Moves the record stored under `original_number` to `record`'s number
    /// and replaces its fields. Nothing changes if the write fails.
    pub fn rename(&self, original_number: &str, record: &CallerRecord) -> Result<()> {
        let key = storage_key(record)?;
        let original = normalize_key(original_number).filter(|original| *original != key);

        let mut conn = self.writer.lock().expect("database mutex poisoned");
        let tx = conn.transaction()?;
        if let Some(original) = original {
            let removed = tx.execute("DELETE FROM caller_info WHERE phone_number = ?1", [original])?;
            if removed == 0 {
                tracing::debug!(number = %original, "original caller was not stored");
            }
        }
        insert_record(&tx, key, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Exact match first, then the `+`-toggled form of the number.
    pub fn lookup(&self, number: &str) -> Result<Option<CallerRecord>> {
        let candidates = lookup_candidates(number);
        if candidates.is_empty() {
            return Ok(None);
        }

        let conn = self.reader();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM caller_info WHERE phone_number = ?1"
        ))?;

        for candidate in &candidates {
            if let Some(record) = stmt.query_row([candidate], record_from_row).optional()? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Returns `false` when no record had that number.
    pub fn remove(&self, number: &str) -> Result<bool> {
        let Some(key) = normalize_key(number) else {
            return Ok(false);
        };
        let conn = self.writer.lock().expect("database mutex poisoned");
        let affected = conn.execute("DELETE FROM caller_info WHERE phone_number = ?1", [key])?;
        Ok(affected > 0)
    }

    /// All records, sorted by name.
    pub fn list_all(&self) -> Result<Vec<CallerRecord>> {
        let conn = self.reader();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM caller_info ORDER BY name ASC, phone_number ASC"
        ))?;
        let rows = stmt.query_map([], record_from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn list_keys(&self) -> Result<Vec<String>> {
        let conn = self.reader();
        let mut stmt = conn.prepare("SELECT phone_number FROM caller_info ORDER BY phone_number ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.writer.lock().expect("database mutex poisoned");
        conn.execute("DELETE FROM caller_info", [])?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.reader();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM caller_info", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Runs `f` while holding the writer connection.
    #[cfg(test)]
    pub fn with_connection<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Connection) -> R,
    {
        let conn = self.writer.lock().expect("database mutex poisoned");
        f(&conn)
    }

    /// Runs `f` while holding the first reader connection.
    #[cfg(test)]
    pub fn with_reader<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Connection) -> R,
    {
        let conn = match self.readers.first() {
            Some(reader) => reader.lock().expect("database mutex poisoned"),
            None => self.writer.lock().expect("database mutex poisoned"),
        };
        f(&conn)
    }
}

/// The record's number as stored. Padded numbers are rejected so a lookup
/// by `record.phone_number` returns exactly the record that was written.
fn storage_key(record: &CallerRecord) -> Result<&str> {
    match normalize_key(&record.phone_number) {
        Some(key) if key == record.phone_number => Ok(key),
        _ => Err(DirectoryError::InvalidNumber(record.phone_number.clone())),
    }
}

fn insert_record(conn: &Connection, key: &str, record: &CallerRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO caller_info (phone_number, country_code, name, appointment, city, ios_row) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            key,
            &record.country_code,
            &record.name,
            &record.appointment,
            &record.city,
            &record.ios_row,
        ),
    )?;
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CallerRecord> {
    Ok(CallerRecord {
        phone_number: row.get(0)?,
        country_code: row.get(1)?,
        name: row.get(2)?,
        appointment: row.get(3)?,
        city: row.get(4)?,
        ios_row: row.get(5)?,
    })
}
