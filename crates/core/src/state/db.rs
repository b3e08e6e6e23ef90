//! # Surveyor Database
//!
//! SQLite persistence for run history at `.surveyor/surveyor.db`.

use crate::error::{WorkflowError, WorkflowResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex, MutexGuard};

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Database handle shared by the stores
pub struct SurveyDb {
    conn: Arc<Mutex<Connection>>,
    /// Disambiguates snapshot ids created in the same microsecond
    snapshot_seq: Arc<AtomicU32>,
}

impl SurveyDb {
    /// Open or create the database in the runtime directory
    pub fn open() -> WorkflowResult<Self> {
        Self::open_at(super::io::get_runtime_path().join("surveyor.db"))
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_at<P: AsRef<Path>>(path: P) -> WorkflowResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                WorkflowError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// In-memory database
    pub fn open_in_memory() -> WorkflowResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> WorkflowResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            snapshot_seq: Arc::new(AtomicU32::new(0)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get a shared connection for use by other modules
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    pub(crate) fn snapshot_seq(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.snapshot_seq)
    }

    fn lock(&self) -> WorkflowResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| WorkflowError::Storage(format!("Lock error: {}", e)))
    }

    /// Run schema migrations
    fn run_migrations(&self) -> WorkflowResult<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
            tracing::debug!(version = SCHEMA_VERSION, "Database migrated");
        }

        Ok(())
    }

    /// Migration to version 1 - snapshot history
    fn migrate_v1(conn: &Connection) -> WorkflowResult<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                phase TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                state TEXT NOT NULL,
                description TEXT,
                parent_id TEXT REFERENCES snapshots(id)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_timestamp ON snapshots(timestamp)",
            [],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db = SurveyDb::open_at(dir.path().join("nested").join("surveyor.db")).unwrap();
        let conn = db.connection();
        let conn = conn.lock().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"snapshots".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_schema_version_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surveyor.db");

        // Open twice - should not fail on second open
        drop(SurveyDb::open_at(&path).unwrap());
        let db = SurveyDb::open_at(&path).unwrap();

        let conn = db.connection();
        let conn = conn.lock().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_eq!(version, SCHEMA_VERSION);
    }
}
