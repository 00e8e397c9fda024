// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Workspace on a remote agent
//!
//! Every operation is a call over an [`AgentChannel`]. Nothing on this path
//! touches the controller's filesystem: a path the agent does not have is
//! simply not found, even if the controller happens to have it.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ReportFile, Topology, TransportError, WorkspaceAccessor, WorkspaceError, scope};

/// A file as reported by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEntry {
    /// Absolute path on the agent
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified_at: Option<DateTime<Utc>>,
}

/// Remote file operations on an agent
#[async_trait]
pub trait AgentChannel: Send + Sync {
    /// Agent name
    fn node_name(&self) -> &str;

    /// Metadata of a file, `None` if absent
    async fn stat(&self, path: &str) -> Result<Option<AgentEntry>, TransportError>;

    /// Contents of a file, `None` if absent
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, TransportError>;

    /// Every file below a directory, recursively
    async fn list(&self, dir: &str) -> Result<Vec<AgentEntry>, TransportError>;
}

/// Timeout and retry budget for agent calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Attempts after the first one
    pub retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 2,
        }
    }
}

/// Workspace of a step that ran on an agent
#[derive(Clone)]
pub struct RemoteWorkspace {
    root: PathBuf,
    channel: Arc<dyn AgentChannel>,
    policy: RetryPolicy,
}

impl RemoteWorkspace {
    /// Create a workspace rooted at `root` on the channel's agent
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, channel: Arc<dyn AgentChannel>) -> Self {
        Self {
            root: root.into(),
            channel,
            policy: RetryPolicy::default(),
        }
    }

    /// Override the timeout and retry budget
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run an agent call with the timeout and retry budget
    async fn call<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, WorkspaceError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, TransportError>> + Send,
        T: Send,
    {
        let node = self.channel.node_name();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let failure = match tokio::time::timeout(self.policy.timeout, attempt()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => TransportError::Timeout {
                    node: node.to_string(),
                    timeout_ms: u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX),
                },
            };
            if attempts > self.policy.retries {
                warn!(node = %node, operation, attempts, error = %failure, "Agent call failed");
                return Err(WorkspaceError::Transport {
                    attempts,
                    source: failure,
                });
            }
            debug!(node = %node, operation, attempts, error = %failure, "Retrying agent call");
        }
    }

    fn report_file(&self, entry: AgentEntry) -> ReportFile {
        let resolved_path = PathBuf::from(&entry.path);
        ReportFile {
            logical_path: scope::logical(&self.root, &resolved_path),
            resolved_path,
            last_modified_at: entry.modified_at,
        }
    }
}

#[async_trait]
impl WorkspaceAccessor for RemoteWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn topology(&self) -> Topology {
        Topology::Agent(self.channel.node_name().to_string())
    }

    async fn resolve(&self, logical: &str) -> Result<ReportFile, WorkspaceError> {
        let path = scope::confine(&self.root, logical)?;
        let path = path.to_string_lossy().into_owned();
        let (channel, path) = (&self.channel, path.as_str());
        match self.call("stat", move || channel.stat(path)).await? {
            Some(entry) => Ok(self.report_file(entry)),
            None => Err(WorkspaceError::PathNotFound {
                path: logical.to_string(),
            }),
        }
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<ReportFile>, WorkspaceError> {
        let (full, base) = scope::glob_pattern(&self.root, pattern)?;
        let matcher = glob::Pattern::new(&full).map_err(|e| WorkspaceError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let base = base.to_string_lossy().into_owned();
        let (channel, base) = (&self.channel, base.as_str());
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };

        let entries = self.call("list", move || channel.list(base)).await?;
        let mut files: Vec<ReportFile> = entries
            .into_iter()
            .filter(|entry| {
                let path = Path::new(&entry.path);
                matcher.matches_path_with(path, options) && scope::confine(&self.root, &entry.path).is_ok()
            })
            .map(|entry| self.report_file(entry))
            .collect();
        files.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
        debug!(pattern = %pattern, matches = files.len(), "Globbed agent workspace");
        Ok(files)
    }

    async fn read(&self, file: &ReportFile) -> Result<Vec<u8>, WorkspaceError> {
        let path = scope::confine(&self.root, &file.resolved_path.to_string_lossy())?;
        let path = path.to_string_lossy().into_owned();
        let (channel, path) = (&self.channel, path.as_str());
        self.call("read", move || channel.read(path))
            .await?
            .ok_or_else(|| WorkspaceError::PathNotFound {
                path: file.logical_path.clone(),
            })
    }

    async fn resolve_on_node(&self, path: &str) -> Result<ReportFile, WorkspaceError> {
        let node_path = scope::on_node(&self.root, path).to_string_lossy().into_owned();
        let (channel, node_path) = (&self.channel, node_path.as_str());
        match self.call("stat", move || channel.stat(node_path)).await? {
            Some(entry) => Ok(ReportFile {
                logical_path: path.to_string(),
                resolved_path: PathBuf::from(&entry.path),
                last_modified_at: entry.modified_at,
            }),
            None => Err(WorkspaceError::PathNotFound {
                path: path.to_string(),
            }),
        }
    }
}

// ============================================================================
// In-memory agent
// ============================================================================

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    modified_at: DateTime<Utc>,
}

/// In-memory agent filesystem
///
/// Supports injected latency and transient failures so retry and timeout
/// handling can be exercised without a real agent.
#[derive(Debug)]
pub struct MemoryAgent {
    name: String,
    files: Mutex<BTreeMap<String, StoredFile>>,
    latency: Option<Duration>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl MemoryAgent {
    /// Create an agent with no files
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Mutex::new(BTreeMap::new()),
            latency: None,
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a file modified now
    #[must_use]
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        let file = StoredFile {
            content: content.into(),
            modified_at: Utc::now(),
        };
        self.files
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), file);
        self
    }

    /// Delay every call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace a file
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Disconnected` if the agent state is poisoned.
    pub fn insert_file(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
        modified_at: DateTime<Utc>,
    ) -> Result<(), TransportError> {
        let file = StoredFile {
            content: content.into(),
            modified_at,
        };
        self.files
            .lock()
            .map(|mut files| {
                files.insert(path.to_string(), file);
            })
            .map_err(|_| self.poisoned())
    }

    /// Make the next `count` calls fail with a disconnect
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of calls received, including failed ones
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(TransportError::Disconnected {
                node: self.name.clone(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn poisoned(&self) -> TransportError {
        TransportError::Disconnected {
            node: self.name.clone(),
            message: "agent state poisoned".to_string(),
        }
    }

    fn snapshot(&self) -> Result<BTreeMap<String, StoredFile>, TransportError> {
        self.files
            .lock()
            .map(|files| files.clone())
            .map_err(|_| self.poisoned())
    }
}

fn entry(path: &str, file: &StoredFile) -> AgentEntry {
    AgentEntry {
        path: path.to_string(),
        size: file.content.len() as u64,
        modified_at: Some(file.modified_at),
    }
}

#[async_trait]
impl AgentChannel for MemoryAgent {
    fn node_name(&self) -> &str {
        &self.name
    }

    async fn stat(&self, path: &str) -> Result<Option<AgentEntry>, TransportError> {
        self.enter().await?;
        Ok(self.snapshot()?.get(path).map(|file| entry(path, file)))
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, TransportError> {
        self.enter().await?;
        Ok(self.snapshot()?.get(path).map(|file| file.content.clone()))
    }

    async fn list(&self, dir: &str) -> Result<Vec<AgentEntry>, TransportError> {
        self.enter().await?;
        let dir = Path::new(dir);
        Ok(self
            .snapshot()?
            .iter()
            .filter(|(path, _)| Path::new(path.as_str()).starts_with(dir))
            .map(|(path, file)| entry(path, file))
            .collect())
    }
}
