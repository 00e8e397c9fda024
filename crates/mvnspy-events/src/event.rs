//! Execution event types
//!
//! An [`ExecutionEvent`] is one plugin goal invocation recorded in a spy log.
//! Events form a tree mirroring the Maven module/goal hierarchy; a [`SpyLog`]
//! owns the top-level events and walks the tree in document order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Event type emitted when a mojo begins executing
pub const MOJO_STARTED: &str = "MojoStarted";

/// Identity used to route events to publishers: `(groupId, artifactId, goal)`
///
/// Plugin version is deliberately not part of the triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoalTriple {
    /// Plugin group id
    pub group_id: String,
    /// Plugin artifact id
    pub artifact_id: String,
    /// Goal name
    pub goal: String,
}

impl GoalTriple {
    /// Create a new triple
    #[must_use]
    pub fn new(group_id: &str, artifact_id: &str, goal: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            goal: goal.to_string(),
        }
    }
}

impl fmt::Display for GoalTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.goal)
    }
}

/// The plugin and goal an event was produced by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCoordinates {
    /// Plugin group id
    pub group_id: String,
    /// Plugin artifact id
    pub artifact_id: String,
    /// Goal name
    pub goal: String,
    /// Plugin version, if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Execution id (e.g. `default-test`), if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
}

impl PluginCoordinates {
    /// The routing triple for these coordinates
    #[must_use]
    pub fn triple(&self) -> GoalTriple {
        GoalTriple::new(&self.group_id, &self.artifact_id, &self.goal)
    }
}

/// The Maven project a goal ran against
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectCoordinates {
    /// Project group id
    pub group_id: String,
    /// Project artifact id
    pub artifact_id: String,
    /// Project version
    pub version: String,
    /// Project base directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    /// Build output directory, when the spy log recorded one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_directory: Option<String>,
}

impl ProjectCoordinates {
    /// Build output directory, defaulting to `<baseDir>/target`
    #[must_use]
    pub fn build_directory(&self) -> Option<String> {
        self.build_directory.clone().or_else(|| {
            self.base_dir
                .as_ref()
                .map(|base| format!("{}/target", base.trim_end_matches('/')))
        })
    }

    /// Substitute the Maven project placeholders this project can answer
    ///
    /// Unknown placeholders are left untouched.
    #[must_use]
    pub fn resolve_placeholders(&self, value: &str) -> String {
        let mut resolved = value.to_string();
        if let Some(build_dir) = self.build_directory() {
            resolved = resolved.replace("${project.build.directory}", &build_dir);
        }
        if let Some(ref base_dir) = self.base_dir {
            resolved = resolved
                .replace("${project.basedir}", base_dir)
                .replace("${basedir}", base_dir);
        }
        resolved
            .replace("${project.groupId}", &self.group_id)
            .replace("${project.artifactId}", &self.artifact_id)
            .replace("${project.version}", &self.version)
    }
}

/// An artifact a goal produced or resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Artifact group id
    pub group_id: String,
    /// Artifact id
    pub artifact_id: String,
    /// Artifact version
    pub version: String,
    /// Artifact type (`jar`, `war`, `pom`, ...)
    pub artifact_type: String,
    /// Optional classifier (`sources`, `tests`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Path of the artifact file, if it exists on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ArtifactRef {
    /// `groupId:artifactId:type[:classifier]:version`
    #[must_use]
    pub fn gav(&self) -> String {
        match self.classifier {
            Some(ref classifier) => format!(
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.artifact_type, classifier, self.version
            ),
            None => format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.artifact_type, self.version
            ),
        }
    }

    /// File name component of [`ArtifactRef::file`]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file
            .as_deref()
            .and_then(|f| f.rsplit(['/', '\\']).next())
            .filter(|name| !name.is_empty())
    }
}

/// One plugin goal invocation recorded in a spy log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Event type (`MojoStarted`, `MojoSucceeded`, `MojoFailed`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Plugin identity and goal
    pub plugin: PluginCoordinates,
    /// Id of the pipeline step that produced the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// When the event was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Project the goal ran against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectCoordinates>,
    /// Goal configuration and extra event attributes
    pub attributes: BTreeMap<String, String>,
    /// Artifacts produced or resolved by the goal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactRef>,
    /// Nested events, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExecutionEvent>,
}

impl ExecutionEvent {
    /// The routing triple of this event
    #[must_use]
    pub fn triple(&self) -> GoalTriple {
        self.plugin.triple()
    }

    /// Look up a configuration value or attribute
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Look up an attribute and resolve project placeholders in it
    #[must_use]
    pub fn resolved_attribute(&self, key: &str) -> Option<String> {
        self.attribute(key).map(|v| self.resolve_placeholders(v))
    }

    /// Resolve Maven project placeholders against this event's project
    #[must_use]
    pub fn resolve_placeholders(&self, value: &str) -> String {
        match self.project {
            Some(ref project) => project.resolve_placeholders(value),
            None => value.to_string(),
        }
    }

    /// Whether this is the start marker of a goal rather than its outcome
    #[must_use]
    pub fn is_mojo_started(&self) -> bool {
        self.event_type.as_deref() == Some(MOJO_STARTED)
    }

    /// Number of events in this subtree, including this one
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// A parsed spy log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpyLog {
    /// Top-level events in document order
    pub events: Vec<ExecutionEvent>,
}

impl SpyLog {
    /// Walk every event in document order, parents before their children
    #[must_use]
    pub fn iter(&self) -> DocumentOrder<'_> {
        DocumentOrder {
            stack: self.events.iter().rev().collect(),
        }
    }

    /// Total number of events, nested ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.iter().map(ExecutionEvent::subtree_len).sum()
    }

    /// Check if the log recorded no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Earliest event timestamp, if any event carries one
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.iter().filter_map(|e| e.timestamp).min()
    }
}

impl<'a> IntoIterator for &'a SpyLog {
    type Item = &'a ExecutionEvent;
    type IntoIter = DocumentOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a [`SpyLog`]
pub struct DocumentOrder<'a> {
    stack: Vec<&'a ExecutionEvent>,
}

impl<'a> Iterator for DocumentOrder<'a> {
    type Item = &'a ExecutionEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.stack.pop()?;
        self.stack.extend(event.children.iter().rev());
        Some(event)
    }
}
