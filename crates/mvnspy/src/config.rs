//! Configuration for mvnspy
//!
//! This module provides the command line configuration for the `mvnspy`
//! binary and the per-job publisher configuration read from JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// mvnspy - publish test reports, fingerprints and artifacts from Maven spy logs
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mvnspy", version, about)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Run store (SQLite), created on first use
    ///
    /// Defaults to `mvnspy/mvnspy.db` under the platform data directory.
    #[arg(short, long, env = "MVNSPY_DATABASE")]
    pub database: Option<PathBuf>,

    /// Build workspace that relative spy log paths resolve against
    #[arg(short, long, env = "MVNSPY_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// mvnspy subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Dispatch a spy log to the enabled publishers
    ///
    /// Example:
    ///   mvnspy publish target/maven-spy.log --job job.json --node linux-agent-1
    Publish {
        /// Spy log written by the instrumented Maven build
        spy_log: PathBuf,

        /// Job configuration (JSON); defaults to all publishers enabled
        #[arg(long)]
        job: Option<PathBuf>,

        /// Run id to attach results to; a new one is generated if absent
        #[arg(long)]
        run: Option<String>,

        /// Node id the step ran on
        #[arg(long, default_value = "controller")]
        node: String,
    },

    /// Print the artifacts attached to a run as JSON
    Show {
        /// Run id
        run: String,
    },
}

impl Config {
    /// Run store location
    ///
    /// Falls back to `<data_local_dir>/mvnspy/mvnspy.db`, e.g.
    /// `~/.local/share/mvnspy/mvnspy.db` on Linux.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        match self.database {
            Some(ref path) => path.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mvnspy")
                .join("mvnspy.db"),
        }
    }

    /// Workspace root, or the current directory
    #[must_use]
    pub fn workspace_path(&self) -> Option<PathBuf> {
        self.workspace
            .clone()
            .or_else(|| std::env::current_dir().ok())
    }

    /// Check the workspace and prepare the run store directory
    ///
    /// # Errors
    ///
    /// Fails when an explicit workspace is missing or not a directory, or
    /// when the database's parent directory cannot be created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(workspace) = self.workspace.as_deref() {
            if !workspace.exists() {
                return Err(ConfigError::WorkspaceNotFound(workspace.to_path_buf()));
            }
            if !workspace.is_dir() {
                return Err(ConfigError::WorkspaceNotDirectory(workspace.to_path_buf()));
            }
        }

        let database = self.database_path();
        match database.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::DatabaseDirectoryCreateFailed(parent.to_path_buf(), e))
            }
            _ => Ok(()),
        }
    }

    /// Level for the tracing filter
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match (self.verbose, self.quiet) {
            (true, _) => tracing::Level::DEBUG,
            (false, true) => tracing::Level::WARN,
            (false, false) => tracing::Level::INFO,
        }
    }
}

// ============================================================================
// Job configuration
// ============================================================================

/// How publishers without an explicit entry are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublisherStrategy {
    /// Every publisher runs unless the job disables it
    #[default]
    All,
    /// Only publishers the job enables run
    Explicit,
}

/// Per-publisher entry in a job configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherToggle {
    /// Whether the publisher runs
    pub enabled: bool,
}

/// Configuration of one `withMaven` job
///
/// ```
/// use mvnspy::config::{JobConfig, PublisherStrategy};
///
/// let job = JobConfig::from_json(r#"{
///     "publisherStrategy": "EXPLICIT",
///     "publishers": { "junitPublisher": { "enabled": true } }
/// }"#).unwrap();
/// assert_eq!(job.publisher_strategy, PublisherStrategy::Explicit);
/// assert_eq!(job.toggle("junitPublisher"), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobConfig {
    /// Strategy applied to publishers without an entry
    pub publisher_strategy: PublisherStrategy,
    /// Maven settings file, as a path on the node running the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maven_settings_file_path: Option<String>,
    /// Explicit per-publisher toggles keyed by publisher id
    pub publishers: BTreeMap<String, PublisherToggle>,
}

impl JobConfig {
    /// Parse a job configuration from JSON
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidJobConfig` if the JSON does not match
    /// the job configuration schema.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::InvalidJobConfig)
    }

    /// Read a job configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::JobConfigRead(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }

    /// Explicit toggle for a publisher, if the job has one
    #[must_use]
    pub fn toggle(&self, publisher_id: &str) -> Option<bool> {
        self.publishers.get(publisher_id).map(|t| t.enabled)
    }

    /// Set an explicit toggle
    #[must_use]
    pub fn with_publisher(mut self, publisher_id: &str, enabled: bool) -> Self {
        self.publishers
            .insert(publisher_id.to_string(), PublisherToggle { enabled });
        self
    }

    /// Use the given strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: PublisherStrategy) -> Self {
        self.publisher_strategy = strategy;
        self
    }

    /// Use the given settings file path
    #[must_use]
    pub fn with_settings_file(mut self, path: &str) -> Self {
        self.maven_settings_file_path = Some(path.to_string());
        self
    }
}

/// CLI and job configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Build workspace does not exist: {0}")]
    WorkspaceNotFound(PathBuf),

    #[error("Build workspace is not a directory: {0}")]
    WorkspaceNotDirectory(PathBuf),

    #[error("Cannot create run store directory {0}: {1}")]
    DatabaseDirectoryCreateFailed(PathBuf, std::io::Error),

    /// Failed to read the job configuration file
    #[error("Failed to read job configuration {0}: {1}")]
    JobConfigRead(PathBuf, std::io::Error),

    /// The job configuration is not valid JSON for the schema
    #[error("Invalid job configuration: {0}")]
    InvalidJobConfig(serde_json::Error),
}
