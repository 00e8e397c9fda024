// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! SQLite run store
//!
//! [`SqliteStore`] persists run artifacts and fingerprints. Uniqueness of
//! `(run_id, key)` and of the content hash is enforced by the schema, so
//! attaches from concurrent steps can never duplicate an artifact.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

use crate::fingerprint::{Fingerprint, FingerprintOrigin, FingerprintStore};
use crate::migrations;
use crate::recorder::{AttachOutcome, RecorderError, RunArtifact, RunRecorder};

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] migrations::MigrationError),

    /// A lock holder panicked
    #[error("Database lock poisoned")]
    Poisoned,
}

/// Run artifacts and fingerprints in one SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Create an initialized in-memory store
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self, DbError> {
        Self::initialized(Connection::open_in_memory()?)
    }

    /// Open (creating if needed) and initialize a database file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::initialized(Connection::open(path)?)
    }

    fn initialized(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let applied = migrations::migrate(&conn)?;
        if !applied.is_empty() {
            debug!(versions = ?applied, "Applied migrations");
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Current schema version
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        Ok(migrations::get_version(&conn)?)
    }

    /// Ids of runs with attached artifacts, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn run_ids(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        let mut stmt =
            conn.prepare("SELECT run_id FROM run_artifacts GROUP BY run_id ORDER BY MIN(seq)")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RecorderError> {
        self.conn.lock().map_err(|_| RecorderError::Poisoned)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RecorderError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RecorderError::Timestamp(format!("{value}: {e}")))
}

struct ArtifactRow {
    key: String,
    node_id: String,
    attached_at: String,
    payload: String,
}

impl ArtifactRow {
    const COLUMNS: &'static str = "key, node_id, attached_at, payload";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            node_id: row.get(1)?,
            attached_at: row.get(2)?,
            payload: row.get(3)?,
        })
    }

    fn into_artifact(self) -> Result<RunArtifact, RecorderError> {
        Ok(RunArtifact {
            key: self.key,
            node_id: self.node_id,
            attached_at: parse_timestamp(&self.attached_at)?,
            payload: serde_json::from_str(&self.payload)?,
        })
    }
}

#[async_trait]
impl RunRecorder for SqliteStore {
    async fn attach(&self, run_id: &str, artifact: RunArtifact) -> Result<AttachOutcome, RecorderError> {
        let payload = serde_json::to_string(&artifact.payload)?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO run_artifacts (run_id, key, node_id, kind, attached_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                artifact.key,
                artifact.node_id,
                artifact.payload.kind(),
                artifact.attached_at.to_rfc3339(),
                payload,
            ],
        )?;
        if inserted == 0 {
            debug!(run_id, key = %artifact.key, "Artifact already attached");
            Ok(AttachOutcome::AlreadyPresent)
        } else {
            debug!(run_id, key = %artifact.key, kind = artifact.payload.kind(), "Attached artifact");
            Ok(AttachOutcome::Attached)
        }
    }

    async fn lookup(&self, run_id: &str, key: &str) -> Result<Option<RunArtifact>, RecorderError> {
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                &format!(
                    "SELECT {} FROM run_artifacts WHERE run_id = ?1 AND key = ?2",
                    ArtifactRow::COLUMNS
                ),
                params![run_id, key],
                ArtifactRow::from_row,
            )
            .optional()?
        };
        row.map(ArtifactRow::into_artifact).transpose()
    }

    async fn artifacts(&self, run_id: &str) -> Result<Vec<RunArtifact>, RecorderError> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM run_artifacts WHERE run_id = ?1 ORDER BY seq",
                ArtifactRow::COLUMNS
            ))?;
            stmt.query_map([run_id], ArtifactRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        rows.into_iter().map(ArtifactRow::into_artifact).collect()
    }
}

fn fingerprint_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Fingerprint, String)> {
    let created_at: String = row.get(4)?;
    let print = Fingerprint {
        content_hash: row.get(0)?,
        origin_build_id: row.get(1)?,
        origin_node_id: row.get(2)?,
        file_name: row.get(3)?,
        created_at: DateTime::<Utc>::MIN_UTC,
    };
    Ok((print, created_at))
}

fn select_fingerprint(conn: &Connection, content_hash: &str) -> Result<Option<Fingerprint>, RecorderError> {
    let row = conn
        .query_row(
            "SELECT content_hash, origin_build_id, origin_node_id, file_name, created_at
             FROM fingerprints WHERE content_hash = ?1",
            [content_hash],
            fingerprint_from_row,
        )
        .optional()?;
    row.map(|(mut print, created_at)| {
        print.created_at = parse_timestamp(&created_at)?;
        Ok(print)
    })
    .transpose()
}

#[async_trait]
impl FingerprintStore for SqliteStore {
    async fn get(&self, content_hash: &str) -> Result<Option<Fingerprint>, RecorderError> {
        let conn = self.lock()?;
        select_fingerprint(&conn, content_hash)
    }

    async fn get_or_create(
        &self,
        content_hash: &str,
        origin: &FingerprintOrigin,
    ) -> Result<Fingerprint, RecorderError> {
        let conn = self.lock()?;
        let fresh = Fingerprint::new(content_hash, origin);
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO fingerprints
             (content_hash, origin_build_id, origin_node_id, file_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fresh.content_hash,
                fresh.origin_build_id,
                fresh.origin_node_id,
                fresh.file_name,
                fresh.created_at.to_rfc3339(),
            ],
        )?;
        if inserted > 0 {
            debug!(hash = %content_hash, file = %origin.file_name, "New fingerprint");
            return Ok(fresh);
        }
        select_fingerprint(&conn, content_hash)?
            .ok_or_else(|| RecorderError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn len(&self) -> Result<usize, RecorderError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM fingerprints", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
