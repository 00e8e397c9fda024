//! Routing of execution events to publisher families
//!
//! Matching is exact on `(groupId, artifactId, goal)`; the plugin version
//! plays no part.

use std::collections::HashMap;
use std::sync::Arc;

use mvnspy_events::{ExecutionEvent, GoalTriple};

use crate::publisher::{Publisher, PublisherKind};

const MAVEN_PLUGINS: &str = "org.apache.maven.plugins";

/// Goals whose test reports are published
#[must_use]
pub fn test_report_triples() -> Vec<GoalTriple> {
    vec![
        GoalTriple::new(MAVEN_PLUGINS, "maven-surefire-plugin", "test"),
        GoalTriple::new(MAVEN_PLUGINS, "maven-failsafe-plugin", "integration-test"),
        GoalTriple::new("org.eclipse.tycho", "tycho-surefire-plugin", "test"),
        GoalTriple::new("com.kelveden", "maven-karma-plugin", "start"),
        GoalTriple::new("com.github.eirslett", "frontend-maven-plugin", "karma"),
    ]
}

/// Goals that package, install or deploy build outputs
#[must_use]
pub fn artifact_triples() -> Vec<GoalTriple> {
    vec![
        GoalTriple::new(MAVEN_PLUGINS, "maven-jar-plugin", "jar"),
        GoalTriple::new(MAVEN_PLUGINS, "maven-war-plugin", "war"),
        GoalTriple::new(MAVEN_PLUGINS, "maven-ear-plugin", "ear"),
        GoalTriple::new(MAVEN_PLUGINS, "maven-install-plugin", "install"),
        GoalTriple::new(MAVEN_PLUGINS, "maven-deploy-plugin", "deploy"),
    ]
}

/// Goals whose produced or resolved files are fingerprinted
#[must_use]
pub fn fingerprint_triples() -> Vec<GoalTriple> {
    let mut triples = artifact_triples();
    triples.push(GoalTriple::new(MAVEN_PLUGINS, "maven-dependency-plugin", "resolve"));
    triples.push(GoalTriple::new(
        MAVEN_PLUGINS,
        "maven-dependency-plugin",
        "copy-dependencies",
    ));
    triples
}

/// Maps goal triples to the publisher families interested in them
#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    routes: HashMap<GoalTriple, Vec<PublisherKind>>,
}

impl EventClassifier {
    /// Classifier for the built-in publishers, in registration order
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut classifier = Self::default();
        classifier.register(PublisherKind::TestReports, &test_report_triples());
        classifier.register(PublisherKind::Artifacts, &artifact_triples());
        classifier.register(PublisherKind::Fingerprints, &fingerprint_triples());
        classifier
    }

    /// Classifier built from the interests of registered publishers
    #[must_use]
    pub fn from_publishers(publishers: &[Arc<dyn Publisher>]) -> Self {
        let mut classifier = Self::default();
        for publisher in publishers {
            classifier.register(publisher.kind(), publisher.interests());
        }
        classifier
    }

    /// Route `interests` to `kind`, after any earlier registrations
    pub fn register(&mut self, kind: PublisherKind, interests: &[GoalTriple]) {
        for triple in interests {
            let kinds = self.routes.entry(triple.clone()).or_default();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }

    /// Publisher families interested in `event`, in registration order
    ///
    /// `MojoStarted` events are never classified: the matching
    /// `MojoSucceeded`/`MojoFailed` event carries the outcome.
    #[must_use]
    pub fn classify(&self, event: &ExecutionEvent) -> Vec<PublisherKind> {
        if event.is_mojo_started() {
            return Vec::new();
        }
        self.routes
            .get(&event.triple())
            .cloned()
            .unwrap_or_default()
    }
}
