//! SQLite-based session archive and key-value store.
//!
//! Provides persistent storage for:
//! - Ended scrolling sessions (duration plus content tally)
//! - Daily and all-time aggregates
//! - Key-value store for engine state, streak counters and date markers

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub analyzed: u32,
    pub flagged: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub total_analyzed: u64,
    pub total_flagged: u64,
    pub today_sessions: u64,
    pub today_minutes: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/unscroll/unscroll.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("unscroll.db");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at  TEXT NOT NULL,
                ended_at    TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                analyzed    INTEGER NOT NULL DEFAULT 0,
                flagged     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);",
        )?;
        Ok(())
    }

    /// Record an ended session to the archive.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        duration_ms: u64,
        analyzed: u32,
        flagged: u32,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sessions (started_at, ended_at, duration_ms, analyzed, flagged)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                started_at.to_rfc3339(),
                ended_at.to_rfc3339(),
                duration_ms,
                analyzed,
                flagged,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*), COALESCE(SUM(duration_ms), 0),
                    COALESCE(SUM(analyzed), 0), COALESCE(SUM(flagged), 0)
             FROM sessions
             WHERE ended_at >= ?1",
        )?;
        let row = stmt.query_row(params![format!("{today}T00:00:00+00:00")], |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        Ok(Stats {
            total_sessions: row.0,
            total_minutes: row.1 / 60_000,
            total_analyzed: row.2,
            total_flagged: row.3,
            today_sessions: row.0,
            today_minutes: row.1 / 60_000,
        })
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*), COALESCE(SUM(duration_ms), 0),
                    COALESCE(SUM(analyzed), 0), COALESCE(SUM(flagged), 0)
             FROM sessions",
        )?;
        let row = stmt.query_row([], |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut stmt2 = self.conn.prepare(
            "SELECT COUNT(*), COALESCE(SUM(duration_ms), 0)
             FROM sessions
             WHERE ended_at >= ?1",
        )?;
        let today_row = stmt2.query_row(params![format!("{today}T00:00:00+00:00")], |row| {
            Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?))
        })?;

        Ok(Stats {
            total_sessions: row.0,
            total_minutes: row.1 / 60_000,
            total_analyzed: row.2,
            total_flagged: row.3,
            today_sessions: today_row.0,
            today_minutes: today_row.1 / 60_000,
        })
    }

    /// Recent sessions, newest first.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, duration_ms, analyzed, flagged
             FROM sessions ORDER BY ended_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, started, ended, duration_ms, analyzed, flagged) = row?;
            let Ok(started_at) = DateTime::parse_from_rfc3339(&started) else {
                continue;
            };
            let Ok(ended_at) = DateTime::parse_from_rfc3339(&ended) else {
                continue;
            };
            records.push(SessionRecord {
                id,
                started_at: started_at.with_timezone(&Utc),
                ended_at: ended_at.with_timezone(&Utc),
                duration_ms,
                analyzed,
                flagged,
            });
        }
        Ok(records)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
