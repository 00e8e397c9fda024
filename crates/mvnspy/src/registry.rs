//! Ordered registry of publishers and their job-level enablement

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{JobConfig, PublisherStrategy};
use crate::publisher::{ArtifactPublisher, FingerprintPublisher, Publisher, TestReportPublisher};

/// Effective configuration of one registered publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Publisher id
    pub id: String,
    /// Whether the publisher runs for the job
    pub enabled: bool,
    /// Strategy the decision was made under
    pub strategy: PublisherStrategy,
    /// Registration index
    pub order: usize,
}

/// Publishers in registration order
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: Vec<Arc<dyn Publisher>>,
}

impl std::fmt::Debug for PublisherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.publishers.iter().map(|p| p.id()))
            .finish()
    }
}

impl PublisherRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in test report, artifact and fingerprint
    /// publishers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TestReportPublisher::new()));
        registry.register(Arc::new(ArtifactPublisher::new()));
        registry.register(Arc::new(FingerprintPublisher::new()));
        registry
    }

    /// Append a publisher; a publisher with the same id is replaced in place
    pub fn register(&mut self, publisher: Arc<dyn Publisher>) {
        match self.publishers.iter().position(|p| p.id() == publisher.id()) {
            Some(index) => self.publishers[index] = publisher,
            None => self.publishers.push(publisher),
        }
    }

    /// All registered publishers
    #[must_use]
    pub fn publishers(&self) -> &[Arc<dyn Publisher>] {
        &self.publishers
    }

    /// Publisher by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Publisher>> {
        self.publishers.iter().find(|p| p.id() == id).cloned()
    }

    /// Effective configuration of every registered publisher for `job`
    #[must_use]
    pub fn configs(&self, job: &JobConfig) -> Vec<PublisherConfig> {
        for id in job.publishers.keys() {
            if self.get(id).is_none() {
                warn!(publisher = %id, "Ignoring configuration for unknown publisher");
            }
        }

        self.publishers
            .iter()
            .enumerate()
            .map(|(order, publisher)| {
                let toggle = job.toggle(publisher.id());
                let enabled = match job.publisher_strategy {
                    PublisherStrategy::All => toggle.unwrap_or(true),
                    PublisherStrategy::Explicit => toggle.unwrap_or(false),
                };
                PublisherConfig {
                    id: publisher.id().to_string(),
                    enabled,
                    strategy: job.publisher_strategy,
                    order,
                }
            })
            .collect()
    }

    /// Enabled publishers for `job`, in registration order
    #[must_use]
    pub fn resolve(&self, job: &JobConfig) -> Vec<Arc<dyn Publisher>> {
        let configs = self.configs(job);
        let resolved: Vec<Arc<dyn Publisher>> = self
            .publishers
            .iter()
            .zip(configs.iter())
            .filter(|(_, config)| config.enabled)
            .map(|(publisher, _)| publisher.clone())
            .collect();
        debug!(
            strategy = ?job.publisher_strategy,
            enabled = ?resolved.iter().map(|p| p.id()).collect::<Vec<_>>(),
            "Resolved publishers"
        );
        resolved
    }
}
