// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Dispatch of spy logs against a local workspace

mod test_utils;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fixtures::{BUILD_SPY_LOG, Harness, build_workspace, kinds, spy_log, summaries};
use mvnspy::config::{JobConfig, PublisherStrategy};
use mvnspy::dispatch::{DispatchError, Dispatcher, ProgressEvent};
use mvnspy::fingerprint::FingerprintStore;
use mvnspy::publisher::junit::NO_NEW_REPORTS;
use mvnspy::recorder::RunRecorder;
use mvnspy::registry::PublisherRegistry;
use mvnspy::workspace::LocalWorkspace;
use similar_asserts::assert_eq;
use test_utils::TempTestDir;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(PublisherRegistry::with_defaults())
}

fn local(dir: &TempTestDir) -> Arc<LocalWorkspace> {
    Arc::new(LocalWorkspace::new(dir.path()).expect("open workspace"))
}

// ============================================================================
// Publishing
// ============================================================================

#[tokio::test]
async fn test_build_log_publishes_each_artifact_once() {
    let dir = TempTestDir::new("publish_once");
    build_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &JobConfig::default(), &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.events_seen, 5);
    assert_eq!(stats.events_classified, 4, "MojoStarted is never routed");
    assert_eq!(stats.artifacts_attached, 3);
    assert_eq!(stats.duplicates_skipped, 2, "install re-announces the jar");
    assert_eq!(stats.warnings, 0);
    assert_eq!(stats.test_failures, 0);

    let artifacts = harness.recorder.artifacts("run-1").await.expect("artifacts");
    assert_eq!(kinds(&artifacts), vec!["test_results", "archived", "fingerprint"]);

    let summary = summaries(&artifacts)[0];
    assert_eq!(summary.suite_name, "maven-surefire-plugin:test");
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.failure_count, 0);
    assert_eq!(summary.duration_ms, 28);

    assert_eq!(harness.fingerprints.len().await.expect("len"), 1);
}

#[tokio::test]
async fn test_redispatch_does_not_duplicate() {
    let dir = TempTestDir::new("redispatch");
    build_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");
    let xml = spy_log(BUILD_SPY_LOG, dir.path());
    let dispatcher = dispatcher();

    dispatcher
        .dispatch(&xml, &JobConfig::default(), &ctx)
        .await
        .expect("first dispatch");
    let again = dispatcher
        .dispatch(&xml, &JobConfig::default(), &ctx)
        .await
        .expect("second dispatch");

    assert_eq!(again.artifacts_attached, 0);
    assert_eq!(again.duplicates_skipped, 5);
    assert_eq!(harness.recorder.artifacts("run-1").await.expect("artifacts").len(), 3);
    assert_eq!(harness.fingerprints.len().await.expect("len"), 1);
}

#[tokio::test]
async fn test_dependency_outside_workspace_is_skipped_quietly() {
    let dir = TempTestDir::new("outside");
    build_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");
    let job = JobConfig::default()
        .with_strategy(PublisherStrategy::Explicit)
        .with_publisher("fingerprintPublisher", true);

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &job, &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.warnings, 0);
    assert!(!harness.log.contains("junit-4.12.jar"));
    assert_eq!(harness.fingerprints.len().await.expect("len"), 1);
}

// ============================================================================
// Publisher enablement
// ============================================================================

#[tokio::test]
async fn test_explicit_strategy_without_entries_touches_nothing() {
    let dir = TempTestDir::new("explicit_nothing");
    build_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");
    let job = JobConfig::default().with_strategy(PublisherStrategy::Explicit);

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &job, &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.events_seen, 5);
    assert_eq!(stats.events_classified, 0);
    assert!(harness.recorder.artifacts("run-1").await.expect("artifacts").is_empty());
    assert_eq!(harness.fingerprints.calls(), 0);
    assert!(harness.log.lines().is_empty());
}

#[tokio::test]
async fn test_all_strategy_honours_disabled_publisher() {
    let dir = TempTestDir::new("all_disabled");
    build_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");
    let job = JobConfig::default().with_publisher("artifactsPublisher", false);

    dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &job, &ctx)
        .await
        .expect("dispatch");

    let artifacts = harness.recorder.artifacts("run-1").await.expect("artifacts");
    assert_eq!(kinds(&artifacts), vec!["test_results", "fingerprint"]);
}

// ============================================================================
// Missing, stale and broken inputs
// ============================================================================

#[tokio::test]
async fn test_missing_reports_directory_attaches_nothing() {
    let dir = TempTestDir::new("no_reports");
    dir.create_file("app/target/app-1.0.jar", fixtures::JAR_BYTES);
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");
    let job = JobConfig::default()
        .with_strategy(PublisherStrategy::Explicit)
        .with_publisher("junitPublisher", true);

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &job, &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.artifacts_attached, 0);
    assert_eq!(stats.warnings, 0);
    assert!(harness.recorder.artifacts("run-1").await.expect("artifacts").is_empty());
}

#[tokio::test]
async fn test_missing_artifact_file_is_a_warning() {
    let dir = TempTestDir::new("no_jar");
    dir.create_file(
        "app/target/surefire-reports/TEST-some.groupid.AnArtifactTest.xml",
        fixtures::SUREFIRE_REPORT,
    );
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &JobConfig::default(), &ctx)
        .await
        .expect("dispatch");

    // jar and install events, each seen by the artifact and fingerprint publishers
    assert_eq!(stats.warnings, 4);
    assert_eq!(stats.artifacts_attached, 1);
    assert!(harness.log.contains("of artifact com.example:app:jar:1.0 not found"));
}

#[tokio::test]
async fn test_corrupt_report_is_isolated() {
    let dir = TempTestDir::new("corrupt");
    build_workspace(&dir);
    dir.create_file(
        "app/target/surefire-reports/TEST-some.groupid.BrokenTest.xml",
        "<testsuite name=\"broken\"><testcase name=\"a\">",
    );
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &JobConfig::default(), &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.artifacts_attached, 3);
    assert!(harness.log.contains("Skipping test report app/target/surefire-reports/TEST-some.groupid.BrokenTest.xml"));

    let artifacts = harness.recorder.artifacts("run-1").await.expect("artifacts");
    assert_eq!(summaries(&artifacts)[0].total_count, 3);
}

#[tokio::test]
async fn test_stale_reports_are_not_published() {
    let dir = TempTestDir::new("stale");
    build_workspace(&dir);
    dir.age_file(
        "app/target/surefire-reports/TEST-some.groupid.AnArtifactTest.xml",
        Duration::from_secs(3600),
    );
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");
    let job = JobConfig::default()
        .with_strategy(PublisherStrategy::Explicit)
        .with_publisher("junitPublisher", true);

    let stats = dispatcher()
        .dispatch(&spy_log(BUILD_SPY_LOG, dir.path()), &job, &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.artifacts_attached, 0);
    assert_eq!(stats.warnings, 1);
    assert!(harness.log.contains(NO_NEW_REPORTS));
}

#[tokio::test]
async fn test_malformed_spy_log_fails_the_pass() {
    let dir = TempTestDir::new("malformed");
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");

    let result = dispatcher()
        .dispatch("<mavenExecution><ExecutionEvent type=\"MojoSucceeded\">", &JobConfig::default(), &ctx)
        .await;

    assert!(matches!(result, Err(DispatchError::SpyLog(_))));
    assert!(harness.recorder.artifacts("run-1").await.expect("artifacts").is_empty());
}

// ============================================================================
// Progress
// ============================================================================

#[tokio::test]
async fn test_progress_reports_start_warnings_and_completion() {
    let dir = TempTestDir::new("progress");
    dir.create_file(
        "app/target/surefire-reports/TEST-some.groupid.AnArtifactTest.xml",
        fixtures::SUREFIRE_REPORT,
    );
    let harness = Harness::new();
    let ctx = harness.context(local(&dir), "controller");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let dispatcher = dispatcher().with_progress(Box::new(move |event| {
        let label = match event {
            ProgressEvent::Started { total_events } => format!("started:{total_events}"),
            ProgressEvent::Warning { publisher, .. } => format!("warning:{publisher}"),
            ProgressEvent::Completed { stats } => format!("completed:{}", stats.artifacts_attached),
        };
        sink.lock().expect("lock").push(label);
    }));

    // An unreadable project directory turns the report publisher's event
    // into an isolated error.
    let xml = r#"<mavenExecution>
        <ExecutionEvent type="MojoSucceeded" plugin-group-id="org.apache.maven.plugins" plugin-artifact-id="maven-surefire-plugin" goal="test"/>
    </mavenExecution>"#;
    let stats = dispatcher
        .dispatch(xml, &JobConfig::default(), &ctx)
        .await
        .expect("dispatch");

    assert_eq!(stats.warnings, 1);
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![
            "started:1".to_string(),
            "warning:junitPublisher".to_string(),
            "completed:0".to_string()
        ]
    );
}
