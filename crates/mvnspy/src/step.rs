// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Build steps
//!
//! A [`Build`] owns one run and its stores. Each `withMaven` step of the
//! build hands over its spy log and workspace; steps on different nodes
//! may run concurrently against the same run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::JobConfig;
use crate::context::{BuildLog, PublisherContext, RunHandle};
use crate::dispatch::{DispatchError, DispatchStats, Dispatcher};
use crate::env::EnvVars;
use crate::fingerprint::FingerprintStore;
use crate::recorder::RunRecorder;
use crate::registry::PublisherRegistry;
use crate::workspace::{WorkspaceAccessor, WorkspaceError};
use mvnspy_events::SpyLog;

/// Environment variable pointing Maven at the settings file
pub const MVN_SETTINGS: &str = "MVN_SETTINGS";

/// Step execution errors
#[derive(Debug, Error)]
pub enum StepError {
    /// The configured settings file does not exist on the step's node
    #[error("Maven settings file not found on the build node: {path}")]
    SettingsFileNotFound {
        /// Configured path
        path: String,
    },

    /// The settings file could not be checked
    #[error("Cannot access Maven settings file {path}: {source}")]
    SettingsFile {
        /// Configured path
        path: String,
        /// Underlying error
        #[source]
        source: WorkspaceError,
    },

    /// The dispatch pass failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The build was aborted before the step started
    #[error("Build aborted")]
    Aborted,

    /// The step task panicked or was cancelled
    #[error("Step task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of a step, as shown on the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepResult {
    /// Everything published, no test failures
    Success,
    /// Published, but some tests failed
    Unstable,
    /// The step failed
    Failure,
}

/// Outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Build result contribution
    pub result: StepResult,
    /// Dispatch statistics
    pub stats: DispatchStats,
}

/// Spy log handed over by a step
#[derive(Debug, Clone)]
pub enum StepLog {
    /// Raw XML, parsed when the step runs
    Xml(String),
    /// Already parsed by the caller
    Parsed(Arc<SpyLog>),
}

impl StepLog {
    fn describe(&self) -> String {
        match self {
            Self::Xml(xml) => format!("{} bytes", xml.len()),
            Self::Parsed(log) => format!("{} events", log.events.len()),
        }
    }
}

impl From<String> for StepLog {
    fn from(xml: String) -> Self {
        Self::Xml(xml)
    }
}

impl From<&str> for StepLog {
    fn from(xml: &str) -> Self {
        Self::Xml(xml.to_string())
    }
}

impl From<SpyLog> for StepLog {
    fn from(log: SpyLog) -> Self {
        Self::Parsed(Arc::new(log))
    }
}

/// One `withMaven` step
#[derive(Clone)]
pub struct StepSpec {
    /// Node the step ran on
    pub node_id: String,
    /// Spy log written by the step
    pub spy_log: StepLog,
    /// Workspace of the step
    pub workspace: Arc<dyn WorkspaceAccessor>,
    /// Step environment
    pub env: EnvVars,
}

impl std::fmt::Debug for StepSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSpec")
            .field("node_id", &self.node_id)
            .field("topology", &self.workspace.topology())
            .field("spy_log", &self.spy_log.describe())
            .finish_non_exhaustive()
    }
}

/// A build run and the stores its steps publish into
#[derive(Clone)]
pub struct Build {
    run: RunHandle,
    recorder: Arc<dyn RunRecorder>,
    fingerprints: Arc<dyn FingerprintStore>,
    dispatcher: Arc<Dispatcher>,
    log: Arc<BuildLog>,
    aborted: Arc<AtomicBool>,
}

impl Build {
    /// Create a build for `run`
    #[must_use]
    pub fn new(
        run: RunHandle,
        recorder: Arc<dyn RunRecorder>,
        fingerprints: Arc<dyn FingerprintStore>,
        registry: PublisherRegistry,
    ) -> Self {
        Self {
            run,
            recorder,
            fingerprints,
            dispatcher: Arc::new(Dispatcher::new(registry)),
            log: Arc::new(BuildLog::new()),
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The run
    #[must_use]
    pub fn run(&self) -> &RunHandle {
        &self.run
    }

    /// Console log of the build
    #[must_use]
    pub fn log(&self) -> &BuildLog {
        &self.log
    }

    /// Stop scheduling further steps; running passes finish
    pub fn abort(&self) {
        warn!(run_id = %self.run.id, "Build aborted");
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Whether [`Build::abort`] was called
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Export the settings file to the step environment
    ///
    /// Only the path is looked at, on the node the step ran on. The file's
    /// content is never read.
    async fn prepare_settings(&self, job: &JobConfig, spec: &mut StepSpec) -> Result<(), StepError> {
        let Some(ref path) = job.maven_settings_file_path else {
            return Ok(());
        };
        let path = spec.env.expand(path);
        match spec.workspace.resolve_on_node(&path).await {
            Ok(file) => {
                let exported = file.resolved_path.to_string_lossy().into_owned();
                spec.env.set(MVN_SETTINGS, &exported);
                self.log
                    .info(format!("Using Maven settings file {exported}"));
                Ok(())
            }
            Err(WorkspaceError::PathNotFound { .. }) => {
                self.log
                    .warn(format!("Maven settings file not found on {}: {path}", spec.node_id));
                Err(StepError::SettingsFileNotFound { path })
            }
            Err(source) => Err(StepError::SettingsFile { path, source }),
        }
    }

    /// Run one step: prepare its environment and dispatch its spy log
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file is missing, the spy log is
    /// malformed or the workspace becomes unreachable.
    pub async fn run_step(&self, job: &JobConfig, mut spec: StepSpec) -> Result<StepOutcome, StepError> {
        if self.is_aborted() {
            return Err(StepError::Aborted);
        }
        info!(run_id = %self.run.id, node_id = %spec.node_id, "Running step");

        self.prepare_settings(job, &mut spec).await?;

        let ctx = PublisherContext {
            workspace: spec.workspace.clone(),
            run: self.run.clone(),
            node_id: spec.node_id.clone(),
            env: spec.env.clone(),
            recorder: self.recorder.clone(),
            fingerprints: self.fingerprints.clone(),
            log: self.log.clone(),
        };
        let stats = match spec.spy_log {
            StepLog::Xml(ref xml) => self.dispatcher.dispatch(xml, job, &ctx).await?,
            StepLog::Parsed(ref log) => self.dispatcher.dispatch_log(log, job, &ctx).await?,
        };

        let result = if stats.test_failures > 0 {
            self.log
                .warn(format!("{} test failures, marking build UNSTABLE", stats.test_failures));
            StepResult::Unstable
        } else {
            StepResult::Success
        };
        Ok(StepOutcome { result, stats })
    }

    /// Run steps as independent tasks against this build's run
    ///
    /// Outcomes are returned in the order of `specs`. A failing step never
    /// affects the others.
    pub async fn run_steps(
        &self,
        job: &JobConfig,
        specs: Vec<StepSpec>,
    ) -> Vec<Result<StepOutcome, StepError>> {
        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            let build = self.clone();
            let job = job.clone();
            handles.push(tokio::spawn(async move { build.run_step(&job, spec).await }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(StepError::Join(e)),
            };
            if let Err(ref e) = outcome {
                error!(run_id = %self.run.id, error = %e, "Step failed");
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Overall build result from step results
#[must_use]
pub fn combine(outcomes: &[Result<StepOutcome, StepError>]) -> StepResult {
    outcomes
        .iter()
        .map(|o| o.as_ref().map_or(StepResult::Failure, |o| o.result))
        .fold(StepResult::Success, |acc, r| match (acc, r) {
            (StepResult::Failure, _) | (_, StepResult::Failure) => StepResult::Failure,
            (StepResult::Unstable, _) | (_, StepResult::Unstable) => StepResult::Unstable,
            _ => StepResult::Success,
        })
}
