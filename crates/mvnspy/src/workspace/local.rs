// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Workspace on the controller's own filesystem

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ReportFile, Topology, WorkspaceAccessor, WorkspaceError, scope};

/// Workspace of a step that ran on the controller
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    /// Open a workspace rooted at an existing directory
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::PathNotFound` if the root does not exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|_| WorkspaceError::PathNotFound {
            path: root.display().to_string(),
        })?;
        Ok(Self { root })
    }

    /// Canonicalise and re-check containment, refusing symlinks that leave
    /// the workspace
    async fn real_path(&self, logical: &str, path: &Path) -> Result<PathBuf, WorkspaceError> {
        let real = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| not_found_or_io(logical, e))?;
        if real.starts_with(&self.root) {
            Ok(real)
        } else {
            debug!(path = %logical, "Symlink resolves outside the workspace");
            Err(WorkspaceError::AccessDenied {
                path: logical.to_string(),
            })
        }
    }

    async fn report_file(&self, logical: &str, path: PathBuf) -> Result<ReportFile, WorkspaceError> {
        let real = self.real_path(logical, &path).await?;
        let metadata = tokio::fs::metadata(&real)
            .await
            .map_err(|e| not_found_or_io(logical, e))?;
        Ok(ReportFile {
            logical_path: scope::logical(&self.root, &path),
            resolved_path: path,
            last_modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

#[async_trait]
impl WorkspaceAccessor for LocalWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn topology(&self) -> Topology {
        Topology::Controller
    }

    async fn resolve(&self, logical: &str) -> Result<ReportFile, WorkspaceError> {
        let path = scope::confine(&self.root, logical)?;
        self.report_file(logical, path).await
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<ReportFile>, WorkspaceError> {
        let (absolute, _) = scope::glob_pattern(&self.root, pattern)?;

        let paths = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, String> {
            let entries = glob::glob(&absolute).map_err(|e| e.to_string())?;
            Ok(entries.filter_map(Result::ok).filter(|p| p.is_file()).collect())
        })
        .await
        .map_err(|e| WorkspaceError::Io {
            path: pattern.to_string(),
            source: std::io::Error::other(e),
        })?
        .map_err(|message| WorkspaceError::Pattern {
            pattern: pattern.to_string(),
            message,
        })?;

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let logical = scope::logical(&self.root, &path);
            match self.report_file(&logical, path).await {
                Ok(file) => files.push(file),
                Err(e) if e.is_no_match() => debug!(path = %logical, error = %e, "Skipping glob match"),
                Err(e) => return Err(e),
            }
        }
        files.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
        debug!(pattern = %pattern, matches = files.len(), "Globbed workspace");
        Ok(files)
    }

    async fn read(&self, file: &ReportFile) -> Result<Vec<u8>, WorkspaceError> {
        let path = scope::confine(&self.root, &file.resolved_path.to_string_lossy())?;
        let real = self.real_path(&file.logical_path, &path).await?;
        tokio::fs::read(&real)
            .await
            .map_err(|e| not_found_or_io(&file.logical_path, e))
    }

    async fn resolve_on_node(&self, path: &str) -> Result<ReportFile, WorkspaceError> {
        let node_path = scope::on_node(&self.root, path);
        let metadata = tokio::fs::metadata(&node_path)
            .await
            .map_err(|e| not_found_or_io(path, e))?;
        if !metadata.is_file() {
            return Err(WorkspaceError::PathNotFound {
                path: path.to_string(),
            });
        }
        Ok(ReportFile {
            logical_path: path.to_string(),
            resolved_path: node_path,
            last_modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

fn not_found_or_io(path: &str, source: std::io::Error) -> WorkspaceError {
    if source.kind() == std::io::ErrorKind::NotFound {
        WorkspaceError::PathNotFound {
            path: path.to_string(),
        }
    } else {
        WorkspaceError::Io {
            path: path.to_string(),
            source,
        }
    }
}
