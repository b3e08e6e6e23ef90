//! # State Snapshots
//!
//! Saved workflow states with parent lineage. A human revision started from a
//! snapshot is saved as its child, so the review history of a survey can be
//! walked back to the original run.

use super::db::SurveyDb;
use super::workflow_state::WorkflowState;
use crate::error::{WorkflowError, WorkflowResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Label of snapshots that record reviewer sign-off
pub const APPROVED_LABEL: &str = "approved";

/// A persisted workflow state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot ID
    pub id: String,
    /// What produced it (`run`, `revise`, ...)
    pub label: String,
    /// Phase of the saved state
    pub phase: String,
    pub timestamp: DateTime<Utc>,
    pub state: WorkflowState,
    /// Optional description/notes
    pub description: Option<String>,
    /// Parent snapshot ID (for revision lineage)
    pub parent_id: Option<String>,
}

impl Snapshot {
    /// Create a new snapshot; `seq` separates ids minted in the same microsecond
    fn new(label: &str, state: WorkflowState, seq: u32) -> Self {
        let timestamp = Utc::now();
        let id = format!(
            "{}_{}_{:06}{:02}",
            label.to_lowercase().replace(' ', "_"),
            timestamp.format("%Y%m%d_%H%M%S"),
            timestamp.timestamp_subsec_micros(),
            seq % 100
        );

        Self {
            id,
            label: label.to_string(),
            phase: state.phase().to_string(),
            timestamp,
            state,
            description: None,
            parent_id: None,
        }
    }

    /// Add a description to the snapshot
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_parent(mut self, parent_id: Option<&str>) -> Self {
        self.parent_id = parent_id.map(str::to_string);
        self
    }

    pub fn is_approved(&self) -> bool {
        self.label == APPROVED_LABEL
    }
}

/// Snapshot store backed by SQLite
pub struct SnapshotStore {
    conn: Arc<Mutex<rusqlite::Connection>>,
    seq: Arc<AtomicU32>,
}

const COLUMNS: &str = "id, label, phase, timestamp, state, description, parent_id";

impl SnapshotStore {
    pub fn new(db: &SurveyDb) -> Self {
        Self {
            conn: db.connection(),
            seq: db.snapshot_seq(),
        }
    }

    /// A fresh, unsaved snapshot with an id unique within this database
    pub fn snapshot(&self, label: &str, state: WorkflowState) -> Snapshot {
        Snapshot::new(label, state, self.seq.fetch_add(1, Ordering::Relaxed))
    }

    fn lock(&self) -> WorkflowResult<MutexGuard<'_, rusqlite::Connection>> {
        self.conn
            .lock()
            .map_err(|e| WorkflowError::Storage(format!("Lock error: {}", e)))
    }

    /// Persist a state, optionally as the child of an existing snapshot
    pub fn save(
        &self,
        state: &WorkflowState,
        label: &str,
        parent_id: Option<&str>,
    ) -> WorkflowResult<Snapshot> {
        let snapshot = self.snapshot(label, state.clone()).with_parent(parent_id);
        self.insert(&snapshot)?;
        Ok(snapshot)
    }

    /// Persist a prepared snapshot
    pub fn insert(&self, snapshot: &Snapshot) -> WorkflowResult<()> {
        if let Some(parent) = &snapshot.parent_id {
            self.load(parent)?;
        }

        let state_json = serde_json::to_string(&snapshot.state)
            .map_err(|e| WorkflowError::Storage(format!("Failed to encode state: {e}")))?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO snapshots (id, label, phase, timestamp, state, description, parent_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                snapshot.id,
                snapshot.label,
                snapshot.phase,
                snapshot.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                state_json,
                snapshot.description,
                snapshot.parent_id,
            ],
        )?;

        tracing::info!(
            snapshot_id = %snapshot.id,
            phase = %snapshot.phase,
            parent_id = ?snapshot.parent_id,
            "Snapshot saved"
        );

        Ok(())
    }

    /// Record sign-off on a snapshot's survey as an `approved` child
    ///
    /// The child carries the parent's state unchanged. Only snapshots with
    /// a drafted survey can be approved.
    pub fn approve(&self, id: &str, note: Option<&str>) -> WorkflowResult<Snapshot> {
        let parent = self.load(id)?;
        if parent.state.survey().is_none() {
            return Err(WorkflowError::Storage(format!("Snapshot {id} has no survey to approve")));
        }

        let mut snapshot = self
            .snapshot(APPROVED_LABEL, parent.state)
            .with_parent(Some(id));
        if let Some(note) = note {
            snapshot = snapshot.with_description(note);
        }
        self.insert(&snapshot)?;

        tracing::info!(snapshot_id = %snapshot.id, parent_id = %id, "Survey approved");
        Ok(snapshot)
    }

    /// Look up a snapshot by ID
    pub fn find(&self, id: &str) -> WorkflowResult<Option<Snapshot>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM snapshots WHERE id = ?1"),
                params![id],
                Self::read_row,
            )
            .optional()?;

        row.map(RawSnapshot::into_snapshot).transpose()
    }

    /// Load a snapshot by ID, failing when it does not exist
    pub fn load(&self, id: &str) -> WorkflowResult<Snapshot> {
        self.find(id)?
            .ok_or_else(|| WorkflowError::Storage(format!("Snapshot not found: {id}")))
    }

    /// List all snapshots (newest first)
    pub fn list(&self) -> WorkflowResult<Vec<Snapshot>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM snapshots ORDER BY timestamp DESC, rowid DESC"
        ))?;

        let rows = stmt
            .query_map([], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawSnapshot::into_snapshot).collect()
    }

    /// The snapshot followed by its ancestors, newest first
    pub fn lineage(&self, id: &str) -> WorkflowResult<Vec<Snapshot>> {
        let mut chain = Vec::new();
        let mut next = Some(id.to_string());

        while let Some(current) = next {
            if chain.iter().any(|s: &Snapshot| s.id == current) {
                return Err(WorkflowError::Storage(format!(
                    "Snapshot lineage cycle at {current}"
                )));
            }
            let snapshot = self.load(&current)?;
            next = snapshot.parent_id.clone();
            chain.push(snapshot);
        }

        Ok(chain)
    }

    /// Get the most recent snapshot
    pub fn latest(&self) -> WorkflowResult<Option<Snapshot>> {
        Ok(self.list()?.into_iter().next())
    }

    fn read_row(row: &rusqlite::Row) -> rusqlite::Result<RawSnapshot> {
        Ok(RawSnapshot {
            id: row.get(0)?,
            label: row.get(1)?,
            phase: row.get(2)?,
            timestamp: row.get(3)?,
            state: row.get(4)?,
            description: row.get(5)?,
            parent_id: row.get(6)?,
        })
    }
}

/// Row as stored, before JSON and timestamp decoding
struct RawSnapshot {
    id: String,
    label: String,
    phase: String,
    timestamp: String,
    state: String,
    description: Option<String>,
    parent_id: Option<String>,
}

impl RawSnapshot {
    fn into_snapshot(self) -> WorkflowResult<Snapshot> {
        let state = serde_json::from_str(&self.state).map_err(|e| {
            WorkflowError::Storage(format!("Snapshot {} has an unreadable state: {e}", self.id))
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                WorkflowError::Storage(format!("Snapshot {} has a bad timestamp: {e}", self.id))
            })?;

        Ok(Snapshot {
            id: self.id,
            label: self.label,
            phase: self.phase,
            timestamp,
            state,
            description: self.description,
            parent_id: self.parent_id,
        })
    }
}
