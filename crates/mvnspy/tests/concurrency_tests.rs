// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Concurrent steps publishing into one run

mod test_utils;

use std::path::Path;
use std::sync::Arc;

use fixtures::{BUILD_SPY_LOG, build_agent, build_workspace, recent_run, spy_log, summaries};
use mvnspy::config::JobConfig;
use mvnspy::db::SqliteStore;
use mvnspy::env::EnvVars;
use mvnspy::fingerprint::{FingerprintStore, MemoryFingerprintStore};
use mvnspy::recorder::{ArtifactPayload, MemoryRunRecorder, RunRecorder};
use mvnspy::registry::PublisherRegistry;
use mvnspy::step::{Build, StepError, StepResult, StepSpec, combine};
use mvnspy::workspace::{LocalWorkspace, RemoteWorkspace};
use similar_asserts::assert_eq;
use test_utils::TempTestDir;

const AGENT_ROOT: &str = "/agent/ws";

fn controller_step(dir: &TempTestDir) -> StepSpec {
    StepSpec {
        node_id: "controller".to_string(),
        spy_log: spy_log(BUILD_SPY_LOG, dir.path()).into(),
        workspace: Arc::new(LocalWorkspace::new(dir.path()).expect("workspace")),
        env: EnvVars::default(),
    }
}

fn agent_step(name: &str) -> StepSpec {
    StepSpec {
        node_id: name.to_string(),
        spy_log: spy_log(BUILD_SPY_LOG, Path::new(AGENT_ROOT)).into(),
        workspace: Arc::new(RemoteWorkspace::new(
            AGENT_ROOT,
            Arc::new(build_agent(name, AGENT_ROOT)),
        )),
        env: EnvVars::default(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_nodes_share_one_run() {
    let dir = TempTestDir::new("two_nodes");
    build_workspace(&dir);
    let recorder = Arc::new(MemoryRunRecorder::new());
    let fingerprints = Arc::new(MemoryFingerprintStore::new());
    let build = Build::new(
        recent_run("run-shared"),
        recorder.clone(),
        fingerprints.clone(),
        PublisherRegistry::with_defaults(),
    );

    let outcomes = build
        .run_steps(
            &JobConfig::default(),
            vec![controller_step(&dir), agent_step("linux-agent-1")],
        )
        .await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(combine(&outcomes), StepResult::Success);

    let artifacts = recorder.artifacts("run-shared").await.expect("artifacts");
    // One test summary per node; the archived path and the jar content are
    // the same on both nodes.
    assert_eq!(summaries(&artifacts).len(), 2);
    let archived = artifacts
        .iter()
        .filter(|a| matches!(a.payload, ArtifactPayload::Archived(_)))
        .count();
    let prints = artifacts
        .iter()
        .filter(|a| matches!(a.payload, ArtifactPayload::Fingerprint(_)))
        .count();
    assert_eq!(archived, 1);
    assert_eq!(prints, 1);
    assert_eq!(fingerprints.len().await.expect("len"), 1);

    let attached: usize = outcomes
        .iter()
        .map(|o| o.as_ref().map_or(0, |o| o.stats.artifacts_attached))
        .sum();
    assert_eq!(attached, artifacts.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_agents_against_sqlite_store() {
    let store = Arc::new(SqliteStore::in_memory().expect("store"));
    let build = Build::new(
        recent_run("run-sqlite"),
        store.clone(),
        store.clone(),
        PublisherRegistry::with_defaults(),
    );

    let steps = (0..8).map(|i| agent_step(&format!("agent-{i}"))).collect();
    let outcomes = build.run_steps(&JobConfig::default(), steps).await;
    assert_eq!(outcomes.len(), 8);
    assert!(outcomes.iter().all(Result::is_ok));

    let artifacts = store.artifacts("run-sqlite").await.expect("artifacts");
    assert_eq!(summaries(&artifacts).len(), 8);
    assert_eq!(artifacts.len(), 10, "8 summaries, one archive, one fingerprint");
    assert_eq!(store.len().await.expect("len"), 1);
}

#[tokio::test]
async fn test_failing_step_does_not_affect_siblings() {
    let dir = TempTestDir::new("sibling_failure");
    build_workspace(&dir);
    let recorder = Arc::new(MemoryRunRecorder::new());
    let build = Build::new(
        recent_run("run-mixed"),
        recorder.clone(),
        Arc::new(MemoryFingerprintStore::new()),
        PublisherRegistry::with_defaults(),
    );

    let mut broken = agent_step("flaky-agent");
    broken.spy_log = "<mavenExecution><ExecutionEvent".into();

    let outcomes = build
        .run_steps(&JobConfig::default(), vec![broken, controller_step(&dir)])
        .await;

    assert!(matches!(outcomes[0], Err(StepError::Dispatch(_))));
    assert!(outcomes[1].is_ok());
    assert_eq!(combine(&outcomes), StepResult::Failure);
    assert_eq!(recorder.artifacts("run-mixed").await.expect("artifacts").len(), 3);
}

#[tokio::test]
async fn test_aborted_build_schedules_nothing() {
    let recorder = Arc::new(MemoryRunRecorder::new());
    let build = Build::new(
        recent_run("run-aborted"),
        recorder.clone(),
        Arc::new(MemoryFingerprintStore::new()),
        PublisherRegistry::with_defaults(),
    );
    build.abort();
    assert!(build.is_aborted());

    let outcomes = build
        .run_steps(&JobConfig::default(), vec![agent_step("a"), agent_step("b")])
        .await;

    assert!(outcomes.iter().all(|o| matches!(o, Err(StepError::Aborted))));
    assert!(recorder.artifacts("run-aborted").await.expect("artifacts").is_empty());
}
