// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Access to the build workspace of a step
//!
//! A step runs either on the controller or on a remote agent. Publishers
//! only ever see the [`WorkspaceAccessor`] trait, so the dispatch core never
//! branches on where the step ran.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod local;
pub mod remote;

pub use local::LocalWorkspace;
pub use remote::{AgentChannel, AgentEntry, MemoryAgent, RemoteWorkspace, RetryPolicy};

/// Where a step's workspace lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// The step ran on the controller
    Controller,
    /// The step ran on the named agent
    Agent(String),
}

/// A file located in a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFile {
    /// Path relative to the workspace root, `/`-separated
    pub logical_path: String,
    /// Absolute path on the node holding the workspace
    pub resolved_path: PathBuf,
    /// Last modification time, when the filesystem reports one
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Transport failures talking to an agent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The call did not complete in time
    #[error("Call to agent {node} timed out after {timeout_ms} ms")]
    Timeout {
        /// Agent name
        node: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// The channel to the agent failed
    #[error("Agent {node} disconnected: {message}")]
    Disconnected {
        /// Agent name
        node: String,
        /// Channel failure description
        message: String,
    },
}

/// Workspace access errors
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Nothing exists at the path
    #[error("Path not found: {path}")]
    PathNotFound {
        /// The requested path
        path: String,
    },

    /// The path resolves outside the workspace
    #[error("Access denied: {path} is outside the workspace")]
    AccessDenied {
        /// The requested path
        path: String,
    },

    /// Agent calls kept failing after retries
    #[error("Transport error after {attempts} attempts: {source}")]
    Transport {
        /// Number of attempts made
        attempts: u32,
        /// Last failure
        #[source]
        source: TransportError,
    },

    /// Filesystem error
    #[error("IO error on {path}: {source}")]
    Io {
        /// The path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The glob pattern is not valid
    #[error("Invalid pattern {pattern}: {message}")]
    Pattern {
        /// The pattern
        pattern: String,
        /// Parser message
        message: String,
    },
}

impl WorkspaceError {
    /// Whether the path simply yields nothing to publish
    #[must_use]
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::PathNotFound { .. } | Self::AccessDenied { .. })
    }

    /// Whether the error comes from the agent channel
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// File access relative to a build workspace, possibly on a remote node
#[async_trait]
pub trait WorkspaceAccessor: Send + Sync {
    /// Workspace root on the node
    fn root(&self) -> &Path;

    /// Where the workspace lives
    fn topology(&self) -> Topology;

    /// Resolve a workspace path (relative, or absolute under the root)
    async fn resolve(&self, logical: &str) -> Result<ReportFile, WorkspaceError>;

    /// Files matching a glob pattern, sorted by path
    ///
    /// A pattern whose base directory does not exist matches nothing.
    async fn glob(&self, pattern: &str) -> Result<Vec<ReportFile>, WorkspaceError>;

    /// Read a resolved file
    async fn read(&self, file: &ReportFile) -> Result<Vec<u8>, WorkspaceError>;

    /// Resolve a path on the node the step ran on
    ///
    /// Relative paths are taken from the workspace root. Not confined to
    /// the workspace, but never consults any other node.
    async fn resolve_on_node(&self, path: &str) -> Result<ReportFile, WorkspaceError>;
}

/// Workspace containment rules shared by every accessor
pub mod scope {
    use std::path::{Component, Path, PathBuf};

    use super::WorkspaceError;

    /// Lexically normalise a path, resolving `.` and `..`
    ///
    /// Returns `None` if `..` climbs above the first component.
    #[must_use]
    pub fn normalize(path: &Path) -> Option<PathBuf> {
        let mut out = PathBuf::new();
        let mut depth = 0usize;
        for component in path.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return None;
                    }
                    out.pop();
                    depth -= 1;
                }
                Component::Normal(name) => {
                    out.push(name);
                    depth += 1;
                }
            }
        }
        Some(out)
    }

    /// Resolve `logical` against `root`, refusing anything outside it
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::AccessDenied` if the path escapes the root.
    pub fn confine(root: &Path, logical: &str) -> Result<PathBuf, WorkspaceError> {
        let denied = || WorkspaceError::AccessDenied {
            path: logical.to_string(),
        };
        let root = normalize(root).ok_or_else(denied)?;
        let candidate = Path::new(logical);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };
        let normalized = normalize(&joined).ok_or_else(denied)?;
        if normalized.starts_with(&root) {
            Ok(normalized)
        } else {
            Err(denied())
        }
    }

    /// Where `path` lives on the node: absolute paths as given, relative
    /// ones under the workspace root
    #[must_use]
    pub fn on_node(root: &Path, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        }
    }

    /// `/`-separated path of `resolved` relative to `root`
    #[must_use]
    pub fn logical(root: &Path, resolved: &Path) -> String {
        let relative = resolved.strip_prefix(root).unwrap_or(resolved);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Glob for `pattern` under `root`, with the root taken literally
    ///
    /// Wildcards only count below the root, so a workspace such as
    /// `/var/ws[1]` still matches its own files. Also returns the deepest
    /// directory holding every match.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::AccessDenied` if the pattern escapes the root.
    pub fn glob_pattern(root: &Path, pattern: &str) -> Result<(String, PathBuf), WorkspaceError> {
        let confined = confine(root, pattern)?;
        let root = normalize(root).ok_or_else(|| WorkspaceError::AccessDenied {
            path: pattern.to_string(),
        })?;
        let relative = logical(&root, &confined);
        let base = root.join(glob_base(Path::new(&relative)));
        let literal_root = glob::Pattern::escape(&root.to_string_lossy());
        let full = if relative.is_empty() {
            literal_root
        } else {
            format!("{}/{relative}", literal_root.trim_end_matches(['/', '\\']))
        };
        Ok((full, base))
    }

    /// Workspace-relative glob for the files in `dir` named like `file_glob`
    ///
    /// `dir` is taken literally, metacharacters included, and may be
    /// relative or absolute under the root.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::AccessDenied` if `dir` escapes the root.
    pub fn dir_glob(root: &Path, dir: &str, file_glob: &str) -> Result<String, WorkspaceError> {
        let confined = confine(root, dir)?;
        let root = normalize(root).unwrap_or_else(|| root.to_path_buf());
        let relative = logical(&root, &confined);
        if relative.is_empty() {
            Ok(file_glob.to_string())
        } else {
            Ok(format!("{}/{file_glob}", glob::Pattern::escape(&relative)))
        }
    }

    /// Leading directory of a glob pattern that contains no wildcards
    #[must_use]
    pub fn glob_base(pattern: &Path) -> PathBuf {
        let mut base = PathBuf::new();
        for component in pattern.components() {
            let text = component.as_os_str().to_string_lossy();
            if text.contains(['*', '?', '[']) {
                break;
            }
            base.push(component.as_os_str());
        }
        base
    }
}
