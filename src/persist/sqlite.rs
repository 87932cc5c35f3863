//! SQLite-backed keyed record storage.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::{session::now_ms, types::DeckKey};

use super::{PersistResult, RecordSlot, StateStore};

/// SQLite implementation of [`crate::persist::StateStore`].
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Opens or creates a store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Decks with at least one saved record, sorted by name.
    pub fn decks(&self) -> PersistResult<Vec<DeckKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT deck FROM deck_state ORDER BY deck ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Last write time of a record, in milliseconds since epoch.
    pub fn updated_at(&self, deck: &str, slot: RecordSlot) -> PersistResult<Option<u64>> {
        let ts: Option<i64> = self
            .conn
            .query_row(
                "SELECT ts_ms FROM deck_state WHERE deck = ?1 AND slot = ?2",
                params![deck, slot.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.map(|v| v as u64))
    }
}

impl StateStore for SqliteStateStore {
    fn read(&self, deck: &str, slot: RecordSlot) -> PersistResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM deck_state WHERE deck = ?1 AND slot = ?2",
                params![deck, slot.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn write(&mut self, deck: &str, slot: RecordSlot, payload: &str) -> PersistResult<()> {
        self.conn.execute(
            "INSERT INTO deck_state(deck, slot, ts_ms, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(deck, slot) DO UPDATE SET ts_ms = excluded.ts_ms, payload = excluded.payload",
            params![deck, slot.as_str(), now_ms() as i64, payload],
        )?;
        Ok(())
    }

    fn remove(&mut self, deck: &str, slot: RecordSlot) -> PersistResult<()> {
        self.conn.execute(
            "DELETE FROM deck_state WHERE deck = ?1 AND slot = ?2",
            params![deck, slot.as_str()],
        )?;
        Ok(())
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}
