// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fingerprint publisher

use async_trait::async_trait;
use tracing::debug;

use super::{PublishError, PublishOutcome, Publisher, PublisherKind, attach_once, load_artifact};
use crate::classifier::fingerprint_triples;
use crate::context::PublisherContext;
use crate::fingerprint::{FingerprintOrigin, md5_hex};
use crate::recorder::ArtifactPayload;
use mvnspy_events::{ExecutionEvent, GoalTriple};

/// Job configuration id
pub const ID: &str = "fingerprintPublisher";

/// Fingerprints the files of produced and resolved artifacts
#[derive(Debug, Clone)]
pub struct FingerprintPublisher {
    interests: Vec<GoalTriple>,
}

impl Default for FingerprintPublisher {
    fn default() -> Self {
        Self {
            interests: fingerprint_triples(),
        }
    }
}

impl FingerprintPublisher {
    /// Create the publisher with its default interests
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Publisher for FingerprintPublisher {
    fn kind(&self) -> PublisherKind {
        PublisherKind::Fingerprints
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
            let hash = md5_hex(&bytes);
            let origin = FingerprintOrigin {
                build_id: ctx.run.id.clone(),
                node_id: ctx.node_id.clone(),
                file_name: artifact
                    .file_name()
                    .map_or_else(|| file.logical_path.clone(), str::to_string),
            };
            let print = ctx.fingerprints.get_or_create(&hash, &origin).await?;
            debug!(
                hash = %hash,
                file = %file.logical_path,
                origin_build = %print.origin_build_id,
                "Fingerprinted artifact"
            );
            let attached =
                attach_once(ctx, format!("fingerprint:{hash}"), ArtifactPayload::Fingerprint(print))
                    .await?;
            outcome.record(attached);
        }

        Ok(outcome)
    }
}
