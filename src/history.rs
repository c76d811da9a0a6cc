use crate::app_dirs::AppDirs;
use crate::session::{RoundRecord, SessionSummary};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

/// SQLite-backed session history. One row per session plus one row per
/// completed round, keyed by the generated session id.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (and migrate) the history database in the app state directory.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("pneuma_history.db"));
        Self::open(db_path)
    }

    /// Open a database at an explicit path. Tests point this at a tempdir.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                round_number INTEGER NOT NULL,
                breaths_completed INTEGER NOT NULL,
                hold_duration_secs INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rounds_session ON rounds(session_id)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    /// Append a finished session and its rounds in one transaction.
    pub fn save_session(&mut self, summary: &SessionSummary) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO sessions (id, created_at) VALUES (?1, ?2)",
            params![summary.session_id, summary.created_at.to_rfc3339()],
        )?;

        for round in &summary.rounds {
            tx.execute(
                r#"
                INSERT INTO rounds
                (session_id, round_number, breaths_completed, hold_duration_secs, started_at, ended_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    summary.session_id,
                    round.round_number,
                    round.breaths_completed,
                    round.hold_duration_secs,
                    round.started_at.to_rfc3339(),
                    round.ended_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// All stored sessions, most recent first, rounds in completion order.
    pub fn recent_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, created_at FROM sessions ORDER BY created_at DESC")?;

        let session_iter = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let created_at = parse_timestamp(row.get::<_, String>(1)?, 1)?;
            Ok((id, created_at))
        })?;

        let mut sessions = Vec::new();
        for session in session_iter {
            let (id, created_at) = session?;
            let rounds = self.rounds_for(&id)?;
            sessions.push(SessionSummary {
                session_id: id,
                created_at,
                rounds,
            });
        }

        Ok(sessions)
    }

    fn rounds_for(&self, session_id: &str) -> Result<Vec<RoundRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT round_number, breaths_completed, hold_duration_secs, started_at, ended_at
            FROM rounds
            WHERE session_id = ?1
            ORDER BY round_number ASC
            "#,
        )?;

        let round_iter = stmt.query_map([session_id], |row| {
            Ok(RoundRecord {
                round_number: row.get(0)?,
                breaths_completed: row.get(1)?,
                hold_duration_secs: row.get(2)?,
                started_at: parse_timestamp(row.get::<_, String>(3)?, 3)?,
                ended_at: parse_timestamp(row.get::<_, String>(4)?, 4)?,
            })
        })?;

        let mut rounds = Vec::new();
        for round in round_iter {
            rounds.push(round?);
        }

        Ok(rounds)
    }

    /// Empty the store.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM rounds", [])?;
        self.conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }

    pub fn session_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
    }
}

fn parse_timestamp(raw: String, col: usize) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                col,
                "timestamp".to_string(),
                rusqlite::types::Type::Text,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn summary(id: &str, created_offset_secs: i64, holds: &[u64]) -> SessionSummary {
        let created_at = Local::now() + Duration::seconds(created_offset_secs);
        let rounds = holds
            .iter()
            .enumerate()
            .map(|(i, &hold)| RoundRecord {
                round_number: i as u32 + 1,
                breaths_completed: 40,
                hold_duration_secs: hold,
                started_at: created_at,
                ended_at: created_at + Duration::seconds(hold as i64),
            })
            .collect();
        SessionSummary {
            session_id: id.to_string(),
            created_at,
            rounds,
        }
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut db = HistoryDb::open(dir.path().join("history.db")).unwrap();

        let original = summary("s1", 0, &[60, 90]);
        db.save_session(&original).unwrap();

        let sessions = db.recent_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "s1");
        assert_eq!(sessions[0].rounds.len(), 2);
        assert_eq!(sessions[0].rounds[0].round_number, 1);
        assert_eq!(sessions[0].rounds[0].hold_duration_secs, 60);
        assert_eq!(sessions[0].rounds[1].hold_duration_secs, 90);
    }

    #[test]
    fn recent_sessions_are_most_recent_first() {
        let dir = tempdir().unwrap();
        let mut db = HistoryDb::open(dir.path().join("history.db")).unwrap();

        db.save_session(&summary("older", -120, &[30])).unwrap();
        db.save_session(&summary("newer", 0, &[45])).unwrap();

        let sessions = db.recent_sessions().unwrap();
        assert_eq!(sessions[0].session_id, "newer");
        assert_eq!(sessions[1].session_id, "older");
    }

    #[test]
    fn clear_empties_the_store() {
        let dir = tempdir().unwrap();
        let mut db = HistoryDb::open(dir.path().join("history.db")).unwrap();

        db.save_session(&summary("s1", 0, &[10])).unwrap();
        assert_eq!(db.session_count().unwrap(), 1);

        db.clear().unwrap();
        assert_eq!(db.session_count().unwrap(), 0);
        assert!(db.recent_sessions().unwrap().is_empty());
    }

    #[test]
    fn session_with_no_rounds_is_stored() {
        let dir = tempdir().unwrap();
        let mut db = HistoryDb::open(dir.path().join("history.db")).unwrap();

        db.save_session(&summary("empty", 0, &[])).unwrap();
        let sessions = db.recent_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].rounds.is_empty());
    }

    #[test]
    fn duplicate_session_id_is_rejected() {
        let dir = tempdir().unwrap();
        let mut db = HistoryDb::open(dir.path().join("history.db")).unwrap();

        db.save_session(&summary("dup", 0, &[10])).unwrap();
        assert!(db.save_session(&summary("dup", 1, &[20])).is_err());
        // The failed transaction must not leave partial rows behind.
        assert_eq!(db.session_count().unwrap(), 1);
    }
}
