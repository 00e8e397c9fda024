// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! mvnspy: publish Maven build results from spy logs
//!
//! A `withMaven` step leaves behind a spy log describing every plugin
//! execution of the build. [`dispatch::Dispatcher`] walks that log, routes
//! each execution to the publishers interested in its goal and records what
//! they produce (test results, fingerprints, archived artifacts) against
//! the build run.

pub mod classifier;
pub mod config;
pub mod context;
pub mod db;
pub mod dispatch;
pub mod env;
pub mod fingerprint;
pub mod migrations;
pub mod publisher;
pub mod recorder;
pub mod registry;
pub mod step;
pub mod workspace;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{JobConfig, PublisherStrategy};
    pub use crate::context::{BuildLog, PublisherContext, RunHandle};
    pub use crate::db::SqliteStore;
    pub use crate::dispatch::{DispatchStats, Dispatcher};
    pub use crate::env::EnvVars;
    pub use crate::registry::PublisherRegistry;
    pub use crate::step::{Build, StepLog, StepOutcome, StepResult, StepSpec};
    pub use crate::workspace::{LocalWorkspace, RemoteWorkspace, WorkspaceAccessor};
}
