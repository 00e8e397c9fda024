// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Archived artifact publisher

use async_trait::async_trait;
use tracing::info;

use super::{PublishError, PublishOutcome, Publisher, PublisherKind, attach_once, load_artifact};
use crate::classifier::artifact_triples;
use crate::context::PublisherContext;
use crate::fingerprint::md5_hex;
use crate::recorder::{ArchivedArtifact, ArtifactPayload};
use mvnspy_events::{ExecutionEvent, GoalTriple};

/// Job configuration id
pub const ID: &str = "artifactsPublisher";

/// Archives files produced by packaging, install and deploy goals
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    interests: Vec<GoalTriple>,
}

impl Default for ArtifactPublisher {
    fn default() -> Self {
        Self {
            interests: artifact_triples(),
        }
    }
}

impl ArtifactPublisher {
    /// Create the publisher with its default interests
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Publisher for ArtifactPublisher {
    fn kind(&self) -> PublisherKind {
        PublisherKind::Artifacts
    }

    fn id(&self) -> &'static str {
        ID
    }

    fn interests(&self) -> &[GoalTriple] {
        &self.interests
    }

    async fn process(
        &self,
        ctx: &PublisherContext,
        event: &ExecutionEvent,
    ) -> Result<PublishOutcome, PublishError> {
        let mut outcome = PublishOutcome::default();

        for artifact in &event.artifacts {
            let Some((file, bytes)) = load_artifact(ctx, event, artifact, &mut outcome).await? else {
                continue;
            };
            let archived = ArchivedArtifact {
                logical_path: file.logical_path.clone(),
                coordinates: artifact.gav(),
                size_bytes: bytes.len() as u64,
                content_hash: md5_hex(&bytes),
            };
            let key = format!("archive:{}:{}", archived.logical_path, archived.content_hash);
            let attached = attach_once(ctx, key, ArtifactPayload::Archived(archived)).await?;
            info!(
                run_id = %ctx.run.id,
                artifact = %artifact.gav(),
                outcome = ?attached,
                "Archived artifact"
            );
            outcome.record(attached);
        }

        Ok(outcome)
    }
}
