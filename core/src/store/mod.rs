//! SQLite persistence layer.
//!
//! RULE: Only the store module talks to the database.
//! Components call store methods; they never execute SQL directly.

use crate::{
    error::RotationResult,
    event::{EventLogEntry, RotationEvent},
    types::{from_millis, to_millis, Timestamp},
};
use rusqlite::{params, Connection};

mod award;
mod cycle;
mod participant;

pub use award::AwardStatsRow;

pub struct RotationStore {
    conn: Connection,
}

impl RotationStore {
    pub fn open(path: &str) -> RotationResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RotationResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RotationResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_roster.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_rotation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_history.sql"))?;
        Ok(())
    }

    /// Run `f` as one unit of work. Every statement issued by `f` commits
    /// together, or none of them survive.
    pub fn atomic<T>(&self, f: impl FnOnce(&Self) -> RotationResult<T>) -> RotationResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::warn!("rollback after '{err}' failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    /// Raw connection access for tooling and fault-injection tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, event: &RotationEvent, at: &Timestamp) -> RotationResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (event_type, payload, created_at) VALUES (?1, ?2, ?3)",
            params![event.type_name(), serde_json::to_string(event)?, to_millis(at)],
        )?;
        Ok(())
    }

    /// Audit log in append order.
    pub fn events(&self) -> RotationResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, payload, created_at FROM event_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    event_type: row.get(1)?,
                    payload: row.get(2)?,
                    created_at: from_millis(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
