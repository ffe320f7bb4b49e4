//! SQLite-backed key-value storage.
//!
//! Holds the handful of preferences the app persists (start moment and
//! habit label). Every write is a single-row `INSERT OR REPLACE`, which
//! SQLite applies atomically: readers see either the old row or the new one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::error::StorageError;

const DB_FILE_NAME: &str = "downbad.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database with a single `prefs` table.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// File backing this database, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Open the database at `<data_dir>/downbad.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(data_dir()?.join(DB_FILE_NAME))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        // Another `downbad` process may be mid-write on the same file.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        migrations::migrate(&self.conn)?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM prefs WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Get an integer value from the kv store.
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] when the stored text is not an integer.
    pub fn kv_get_i64(&self, key: &str) -> Result<Option<i64>, StorageError> {
        match self.kv_get(key)? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StorageError::Corrupt {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }

    /// Set a value in the kv store, replacing any previous value. `at` is
    /// recorded as the write time.
    pub fn kv_set(&self, key: &str, value: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO prefs (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// SQLite's `data_version` for this connection.
    ///
    /// Changes whenever another connection commits to the same file. Writes
    /// made through this connection leave it unchanged.
    pub fn data_version(&self) -> Result<i64, StorageError> {
        let version = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get::<_, i64>(0))?;
        Ok(version)
    }

    /// When `key` was last written. `None` if the key is absent or predates
    /// write tracking.
    pub fn kv_updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let raw = self
            .conn
            .query_row(
                "SELECT updated_at FROM prefs WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}
