// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Spy log dispatch
//!
//! This module walks a parsed spy log in document order and hands every
//! classified event to the enabled publishers interested in it.
//!
//! # Example
//!
//! ```no_run
//! # async fn example(ctx: mvnspy::context::PublisherContext) {
//! use mvnspy::config::JobConfig;
//! use mvnspy::dispatch::Dispatcher;
//! use mvnspy::registry::PublisherRegistry;
//!
//! let dispatcher = Dispatcher::new(PublisherRegistry::with_defaults());
//! let xml = std::fs::read_to_string("target/maven-spy.log").expect("read spy log");
//! let stats = dispatcher
//!     .dispatch(&xml, &JobConfig::default(), &ctx)
//!     .await
//!     .expect("dispatch");
//! println!("Attached {} artifacts", stats.artifacts_attached);
//! # }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classifier::EventClassifier;
use crate::config::JobConfig;
use crate::context::PublisherContext;
use crate::publisher::{PublishError, PublishOutcome};
use crate::registry::PublisherRegistry;
use mvnspy_events::{SpyLog, SpyLogError, parse_spy_log};

// ============================================================================
// Error Types
// ============================================================================

/// Dispatch errors; each one ends the pass
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The spy log could not be parsed
    #[error("Spy log error: {0}")]
    SpyLog(#[from] SpyLogError),

    /// A publisher hit an error that must stop the pass
    #[error("Publisher {publisher} failed: {source}")]
    Publisher {
        /// Publisher id
        publisher: String,
        /// Underlying error
        #[source]
        source: PublishError,
    },
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Progress callback signature
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Progress event during a dispatch pass
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Pass started
    Started {
        /// Number of events in the log
        total_events: usize,
    },
    /// A publisher error was confined to its publisher
    Warning {
        /// Publisher id
        publisher: String,
        /// Description of the warning
        message: String,
    },
    /// Pass completed
    Completed {
        /// Statistics from the pass
        stats: DispatchStats,
    },
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics from a dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Events walked
    pub events_seen: usize,
    /// Events routed to at least one enabled publisher
    pub events_classified: usize,
    /// Artifacts newly attached to the run
    pub artifacts_attached: usize,
    /// Artifacts the run already had
    pub duplicates_skipped: usize,
    /// Failed test cases in published reports
    pub test_failures: usize,
    /// Warnings written to the build log
    pub warnings: usize,
}

impl DispatchStats {
    /// Merge stats from another pass
    pub fn merge(&mut self, other: &DispatchStats) {
        self.events_seen += other.events_seen;
        self.events_classified += other.events_classified;
        self.artifacts_attached += other.artifacts_attached;
        self.duplicates_skipped += other.duplicates_skipped;
        self.test_failures += other.test_failures;
        self.warnings += other.warnings;
    }

    fn add(&mut self, outcome: &PublishOutcome) {
        self.artifacts_attached += outcome.attached;
        self.duplicates_skipped += outcome.duplicates;
        self.test_failures += outcome.test_failures;
        self.warnings += outcome.warnings;
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes spy log events to publishers
pub struct Dispatcher {
    registry: PublisherRegistry,
    classifier: EventClassifier,
    progress: Option<ProgressCallback>,
}

impl Dispatcher {
    /// Create a dispatcher over the publishers of `registry`
    #[must_use]
    pub fn new(registry: PublisherRegistry) -> Self {
        let classifier = EventClassifier::from_publishers(registry.publishers());
        Self {
            registry,
            classifier,
            progress: None,
        }
    }

    /// Set a progress callback
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Registry the dispatcher was built from
    #[must_use]
    pub fn registry(&self) -> &PublisherRegistry {
        &self.registry
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.progress {
            callback(&event);
        }
    }

    /// Parse a spy log and dispatch it
    ///
    /// # Errors
    ///
    /// Returns an error if the spy log is malformed or a publisher loses
    /// the connection to the workspace.
    pub async fn dispatch(
        &self,
        spy_log_xml: &str,
        job: &JobConfig,
        ctx: &PublisherContext,
    ) -> Result<DispatchStats, DispatchError> {
        let log = parse_spy_log(spy_log_xml)?;
        self.dispatch_log(&log, job, ctx).await
    }

    /// Dispatch an already parsed spy log
    ///
    /// Events are processed one at a time in document order; each event is
    /// offered to the enabled, interested publishers in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if a publisher loses the connection to the
    /// workspace. Other publisher errors are logged as warnings.
    pub async fn dispatch_log(
        &self,
        log: &SpyLog,
        job: &JobConfig,
        ctx: &PublisherContext,
    ) -> Result<DispatchStats, DispatchError> {
        let publishers = self.registry.resolve(job);
        let total_events = log.len();
        info!(
            run_id = %ctx.run.id,
            node_id = %ctx.node_id,
            events = total_events,
            publishers = publishers.len(),
            "Starting dispatch"
        );
        self.report(ProgressEvent::Started { total_events });

        let mut stats = DispatchStats::default();

        for event in log {
            stats.events_seen += 1;
            let kinds = self.classifier.classify(event);
            if kinds.is_empty() {
                continue;
            }

            let triple = event.triple();
            let mut classified = false;
            for publisher in &publishers {
                if !kinds.contains(&publisher.kind()) || !publisher.interests().contains(&triple) {
                    continue;
                }
                classified = true;
                debug!(publisher = publisher.id(), goal = %triple, "Processing event");

                match publisher.process(ctx, event).await {
                    Ok(outcome) => stats.add(&outcome),
                    Err(e) if e.is_fatal() => {
                        ctx.log.warn(format!("{} failed: {e}", publisher.id()));
                        return Err(DispatchError::Publisher {
                            publisher: publisher.id().to_string(),
                            source: e,
                        });
                    }
                    Err(e) => {
                        warn!(publisher = publisher.id(), goal = %triple, error = %e, "Publisher failed");
                        ctx.log
                            .warn(format!("{} skipped {triple}: {e}", publisher.id()));
                        stats.warnings += 1;
                        self.report(ProgressEvent::Warning {
                            publisher: publisher.id().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
            if classified {
                stats.events_classified += 1;
            }
        }

        info!(
            run_id = %ctx.run.id,
            attached = stats.artifacts_attached,
            duplicates = stats.duplicates_skipped,
            warnings = stats.warnings,
            "Dispatch complete"
        );
        self.report(ProgressEvent::Completed { stats });

        Ok(stats)
    }
}
