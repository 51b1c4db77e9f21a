//! SQLite local store.
//!
//! Implements `LocalStore` using rusqlite (bundled). Each slot is one row of
//! the `slots` table holding the JSON-encoded record list, so a slot write is
//! a single-statement replace.

use parking_lot::Mutex;
use rusqlite::{params, OptionalExtension};

use crate::error::StorageError;
use crate::types::{timestamp_now, Record};

use super::traits::{decode_slot, encode_slot, LocalStore};

// ============================================================================
// SqliteLocalStore
// ============================================================================

pub struct SqliteLocalStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteLocalStore {
    /// Open (creating if needed) a file-backed store.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory store (useful for tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;
             CREATE TABLE IF NOT EXISTS slots (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Keys of all stored slots, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM slots ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}

impl LocalStore for SqliteLocalStore {
    fn read(&self, key: &str) -> Result<Vec<Record>, StorageError> {
        let raw: Option<String> = {
            let conn = self.conn.lock();
            let value = conn
                .query_row("SELECT value FROM slots WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            value
        };
        match raw {
            Some(raw) => decode_slot(key, &raw),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, key: &str, records: &[Record]) -> Result<(), StorageError> {
        let raw = encode_slot(key, records)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, raw, timestamp_now()],
        )?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM slots WHERE key = ?1", params![key])?;
        Ok(())
    }
}
