// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Result artifacts attached to a build run
//!
//! A run is append-only: an artifact is attached under a key at most once,
//! and a second attach with the same key reports
//! [`AttachOutcome::AlreadyPresent`] instead of replacing it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::fingerprint::Fingerprint;
use mvnspy_reports::TestResultSummary;

/// Recorder and fingerprint store errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Payload (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored timestamp could not be read back
    #[error("Invalid timestamp in store: {0}")]
    Timestamp(String),

    /// A lock holder panicked
    #[error("Store lock poisoned")]
    Poisoned,
}

/// An archived build artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedArtifact {
    /// Path relative to the workspace
    pub logical_path: String,
    /// Maven coordinates `group:artifact:type[:classifier]:version`
    pub coordinates: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// MD5 of the content, hex encoded
    pub content_hash: String,
}

/// What an attached artifact carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactPayload {
    /// Aggregated test results
    TestResults(TestResultSummary),
    /// Fingerprint of a produced or consumed file
    Fingerprint(Fingerprint),
    /// Archived build output
    Archived(ArchivedArtifact),
}

impl ArtifactPayload {
    /// Short name of the payload kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TestResults(_) => "test_results",
            Self::Fingerprint(_) => "fingerprint",
            Self::Archived(_) => "archived",
        }
    }
}

/// A result artifact attached to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Identity within the run; attaching the same key twice is a no-op
    pub key: String,
    /// Node the producing step ran on
    pub node_id: String,
    /// When the artifact was attached
    pub attached_at: DateTime<Utc>,
    /// The artifact itself
    pub payload: ArtifactPayload,
}

impl RunArtifact {
    /// Create an artifact attached now
    #[must_use]
    pub fn new(key: impl Into<String>, node_id: &str, payload: ArtifactPayload) -> Self {
        Self {
            key: key.into(),
            node_id: node_id.to_string(),
            attached_at: Utc::now(),
            payload,
        }
    }
}

/// Result of an attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachOutcome {
    /// The artifact was added
    Attached,
    /// An artifact with the same key was already on the run
    AlreadyPresent,
}

/// Append-only store of run artifacts
#[async_trait]
pub trait RunRecorder: Send + Sync {
    /// Attach an artifact unless one with the same key exists
    async fn attach(&self, run_id: &str, artifact: RunArtifact) -> Result<AttachOutcome, RecorderError>;

    /// Artifact attached under `key`
    async fn lookup(&self, run_id: &str, key: &str) -> Result<Option<RunArtifact>, RecorderError>;

    /// All artifacts of a run in attach order
    async fn artifacts(&self, run_id: &str) -> Result<Vec<RunArtifact>, RecorderError>;
}

type RunLog = Arc<Mutex<Vec<RunArtifact>>>;

/// In-memory recorder with one lock per run
#[derive(Debug, Default)]
pub struct MemoryRunRecorder {
    runs: Mutex<HashMap<String, RunLog>>,
}

impl MemoryRunRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, run_id: &str) -> Result<RunLog, RecorderError> {
        let mut runs = self.runs.lock().map_err(|_| RecorderError::Poisoned)?;
        Ok(runs.entry(run_id.to_string()).or_default().clone())
    }
}

#[async_trait]
impl RunRecorder for MemoryRunRecorder {
    async fn attach(&self, run_id: &str, artifact: RunArtifact) -> Result<AttachOutcome, RecorderError> {
        let run = self.run(run_id)?;
        let mut artifacts = run.lock().map_err(|_| RecorderError::Poisoned)?;
        if artifacts.iter().any(|a| a.key == artifact.key) {
            debug!(run_id, key = %artifact.key, "Artifact already attached");
            return Ok(AttachOutcome::AlreadyPresent);
        }
        debug!(run_id, key = %artifact.key, kind = artifact.payload.kind(), "Attached artifact");
        artifacts.push(artifact);
        Ok(AttachOutcome::Attached)
    }

    async fn lookup(&self, run_id: &str, key: &str) -> Result<Option<RunArtifact>, RecorderError> {
        let run = self.run(run_id)?;
        let artifacts = run.lock().map_err(|_| RecorderError::Poisoned)?;
        Ok(artifacts.iter().find(|a| a.key == key).cloned())
    }

    async fn artifacts(&self, run_id: &str) -> Result<Vec<RunArtifact>, RecorderError> {
        let run = self.run(run_id)?;
        let artifacts = run.lock().map_err(|_| RecorderError::Poisoned)?;
        Ok(artifacts.clone())
    }
}
