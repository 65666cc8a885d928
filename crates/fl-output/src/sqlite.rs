//! SQLite event log backend (feature `sqlite`).
//!
//! Creates (or reopens) `robot_events.db` in the configured directory with a
//! single `robot_events` table.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::EventWriter;
use crate::{EventRow, OutputResult};

pub const SQLITE_FILE_NAME: &str = "robot_events.db";

/// Appends robot events to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `robot_events.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join(SQLITE_FILE_NAME))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS robot_events (
                 seq      INTEGER PRIMARY KEY AUTOINCREMENT,
                 unix_ms  INTEGER NOT NULL,
                 robot_id TEXT    NOT NULL,
                 action   TEXT    NOT NULL,
                 status   TEXT    NOT NULL,
                 vertex   INTEGER,
                 detail   TEXT    NOT NULL
             );
             CREATE INDEX IF NOT EXISTS robot_events_by_robot ON robot_events (robot_id);",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl EventWriter for SqliteWriter {
    fn write_event(&mut self, row: &EventRow) -> OutputResult<()> {
        self.finished = false;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO robot_events (unix_ms, robot_id, action, status, vertex, detail) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        stmt.execute(rusqlite::params![
            row.unix_ms as i64,
            row.robot,
            row.action,
            row.status,
            row.vertex,
            row.detail,
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
