//! Everything a publisher needs to process an event
//!
//! The context is passed explicitly into every publisher call; there is no
//! global lookup of the run, workspace or stores.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::env::EnvVars;
use crate::fingerprint::FingerprintStore;
use crate::recorder::RunRecorder;
use crate::workspace::WorkspaceAccessor;

/// Identity of the build run results are attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    /// Run id
    pub id: String,
    /// When the run started; reports older than this are stale
    pub started_at: DateTime<Utc>,
}

impl RunHandle {
    /// Handle for an existing run
    #[must_use]
    pub fn new(id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            started_at,
        }
    }

    /// A new run with a random id, started now
    #[must_use]
    pub fn start() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }
}

/// Console log of a run, as the user sees it
///
/// Lines are also emitted as `tracing` events.
#[derive(Debug, Default)]
pub struct BuildLog {
    lines: Mutex<Vec<String>>,
}

impl BuildLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an informational line
    pub fn info(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "mvnspy::build_log", "{line}");
        self.push(format!("[withMaven] {line}"));
    }

    /// Append a warning line
    pub fn warn(&self, line: impl Into<String>) {
        let line = line.into();
        warn!(target: "mvnspy::build_log", "{line}");
        self.push(format!("[withMaven] WARNING {line}"));
    }

    /// Snapshot of all lines
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any line contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .map(|l| l.iter().any(|line| line.contains(needle)))
            .unwrap_or(false)
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

/// Per-step context handed to publishers
#[derive(Clone)]
pub struct PublisherContext {
    /// Workspace of the step
    pub workspace: Arc<dyn WorkspaceAccessor>,
    /// Run results are attached to
    pub run: RunHandle,
    /// Node the step ran on
    pub node_id: String,
    /// Step environment
    pub env: EnvVars,
    /// Run artifact store
    pub recorder: Arc<dyn RunRecorder>,
    /// Fingerprint store
    pub fingerprints: Arc<dyn FingerprintStore>,
    /// Console log of the run
    pub log: Arc<BuildLog>,
}

impl std::fmt::Debug for PublisherContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublisherContext")
            .field("root", &self.workspace.root())
            .field("topology", &self.workspace.topology())
            .field("run", &self.run)
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}
