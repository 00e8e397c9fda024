// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Publishers turn classified events into run artifacts
//!
//! Each publisher declares the goal triples it is interested in and is
//! handed matching events one at a time, in document order. Publishing is
//! idempotent per run: artifacts are keyed on node and content identity and
//! the recorder only ever inserts a key once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::context::PublisherContext;
use crate::recorder::{ArtifactPayload, AttachOutcome, RecorderError, RunArtifact};
use crate::workspace::{ReportFile, WorkspaceError};
use mvnspy_events::{ArtifactRef, ExecutionEvent, GoalTriple};

pub mod artifacts;
pub mod fingerprint;
pub mod junit;

pub use artifacts::ArtifactPublisher;
pub use fingerprint::FingerprintPublisher;
pub use junit::TestReportPublisher;

/// Publisher families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherKind {
    /// JUnit test reports
    TestReports,
    /// Archived build outputs
    Artifacts,
    /// Content fingerprints
    Fingerprints,
}

impl PublisherKind {
    /// Job configuration id of the built-in publisher of this kind
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::TestReports => junit::ID,
            Self::Artifacts => artifacts::ID,
            Self::Fingerprints => fingerprint::ID,
        }
    }
}

/// Publisher errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// Workspace access failed
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Recording the artifact failed
    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    /// The event lacks data the publisher needs
    #[error("Cannot publish {triple}: {message}")]
    Incomplete {
        /// Goal triple of the event
        triple: String,
        /// What is missing
        message: String,
    },
}

impl PublishError {
    /// Whether the error must end the dispatch pass
    ///
    /// Only an unreachable agent is fatal; everything else is confined to
    /// the publisher that raised it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Workspace(e) if e.is_transport())
    }
}

/// What one `process` call produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Artifacts newly attached
    pub attached: usize,
    /// Artifacts skipped because the run already had them
    pub duplicates: usize,
    /// Failed or errored test cases in published reports
    pub test_failures: usize,
    /// Warnings written to the build log
    pub warnings: usize,
}

impl PublishOutcome {
    /// Count an attach outcome
    pub fn record(&mut self, outcome: AttachOutcome) {
        match outcome {
            AttachOutcome::Attached => self.attached += 1,
            AttachOutcome::AlreadyPresent => self.duplicates += 1,
        }
    }

    /// An outcome with a single warning
    #[must_use]
    pub fn warning() -> Self {
        Self {
            warnings: 1,
            ..Self::default()
        }
    }
}

/// Converts events into durable run artifacts
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher family
    fn kind(&self) -> PublisherKind;

    /// Id used in job configuration
    fn id(&self) -> &'static str;

    /// Goal triples this publisher handles
    fn interests(&self) -> &[GoalTriple];

    /// Publish whatever `event` produced
    async fn process(
        &self,
        ctx: &PublisherContext,
        event: &ExecutionEvent,
    ) -> Result<PublishOutcome, PublishError>;
}

/// Attach an artifact unless the run already has its key
pub(crate) async fn attach_once(
    ctx: &PublisherContext,
    key: String,
    payload: ArtifactPayload,
) -> Result<AttachOutcome, PublishError> {
    if ctx.recorder.lookup(&ctx.run.id, &key).await?.is_some() {
        debug!(run_id = %ctx.run.id, key = %key, "Skipping already published artifact");
        return Ok(AttachOutcome::AlreadyPresent);
    }
    let artifact = RunArtifact::new(key, &ctx.node_id, payload);
    Ok(ctx.recorder.attach(&ctx.run.id, artifact).await?)
}

/// Resolve and read the file of an artifact
///
/// Missing files are a build-log warning. Files outside the workspace, such
/// as dependencies in the local repository, are skipped quietly.
pub(crate) async fn load_artifact(
    ctx: &PublisherContext,
    event: &ExecutionEvent,
    artifact: &ArtifactRef,
    outcome: &mut PublishOutcome,
) -> Result<Option<(ReportFile, Vec<u8>)>, PublishError> {
    let Some(ref file) = artifact.file else {
        return Ok(None);
    };
    let path = ctx.env.expand(&event.resolve_placeholders(file));

    let loaded = match ctx.workspace.resolve(&path).await {
        Ok(resolved) => ctx
            .workspace
            .read(&resolved)
            .await
            .map(|bytes| (resolved, bytes)),
        Err(e) => Err(e),
    };
    match loaded {
        Ok(loaded) => Ok(Some(loaded)),
        Err(WorkspaceError::AccessDenied { .. }) => {
            debug!(artifact = %artifact.gav(), path = %path, "Artifact file outside workspace");
            Ok(None)
        }
        Err(WorkspaceError::PathNotFound { .. }) => {
            ctx.log
                .warn(format!("File {path} of artifact {} not found", artifact.gav()));
            outcome.warnings += 1;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
