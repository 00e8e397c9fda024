// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test report publishing for each supported plugin

mod test_utils;

use std::sync::Arc;

use fixtures::{Harness, TEST_PLUGINS_SPY_LOG, recent_run, spy_log, summaries, test_plugins_workspace};
use mvnspy::config::{JobConfig, PublisherStrategy};
use mvnspy::env::EnvVars;
use mvnspy::fingerprint::MemoryFingerprintStore;
use mvnspy::publisher::{Publisher, TestReportPublisher};
use mvnspy::recorder::{MemoryRunRecorder, RunRecorder};
use mvnspy::registry::PublisherRegistry;
use mvnspy::step::{Build, StepLog, StepOutcome, StepResult, StepSpec};
use mvnspy::workspace::LocalWorkspace;
use mvnspy_events::parse_spy_log;
use similar_asserts::assert_eq;
use test_utils::TempTestDir;

fn junit_only() -> JobConfig {
    JobConfig::default()
        .with_strategy(PublisherStrategy::Explicit)
        .with_publisher("junitPublisher", true)
}

#[tokio::test]
async fn test_every_plugin_variant_is_published_once() {
    let dir = TempTestDir::new("variants");
    test_plugins_workspace(&dir);
    let recorder = Arc::new(MemoryRunRecorder::new());
    let build = Build::new(
        recent_run("run-variants"),
        recorder.clone(),
        Arc::new(MemoryFingerprintStore::new()),
        PublisherRegistry::with_defaults(),
    );

    let outcome = build
        .run_step(
            &junit_only(),
            StepSpec {
                node_id: "controller".to_string(),
                spy_log: spy_log(TEST_PLUGINS_SPY_LOG, dir.path()).into(),
                workspace: Arc::new(LocalWorkspace::new(dir.path()).expect("workspace")),
                env: EnvVars::default(),
            },
        )
        .await
        .expect("step");

    assert_eq!(outcome.stats.artifacts_attached, 5);
    assert_eq!(outcome.stats.test_failures, 2);
    assert_eq!(outcome.result, StepResult::Unstable);
    assert!(build.log().contains("marking build UNSTABLE"));

    let artifacts = recorder.artifacts("run-variants").await.expect("artifacts");
    let suites: Vec<(String, usize, usize, usize)> = summaries(&artifacts)
        .into_iter()
        .map(|s| (s.suite_name.clone(), s.total_count, s.failure_count, s.skipped_count))
        .collect();
    assert_eq!(
        suites,
        vec![
            ("maven-surefire-plugin:test".to_string(), 3, 0, 0),
            ("maven-failsafe-plugin:integration-test".to_string(), 2, 2, 0),
            ("tycho-surefire-plugin:test".to_string(), 3, 0, 0),
            ("maven-karma-plugin:start".to_string(), 3, 0, 1),
            ("frontend-maven-plugin:karma".to_string(), 3, 0, 1),
        ]
    );
}

async fn publish_test_plugins(dir: &TempTestDir, spy_log: StepLog) -> (StepOutcome, usize) {
    let recorder = Arc::new(MemoryRunRecorder::new());
    let build = Build::new(
        recent_run("run-plugins"),
        recorder.clone(),
        Arc::new(MemoryFingerprintStore::new()),
        PublisherRegistry::with_defaults(),
    );
    let outcome = build
        .run_step(
            &junit_only(),
            StepSpec {
                node_id: "controller".to_string(),
                spy_log,
                workspace: Arc::new(LocalWorkspace::new(dir.path()).expect("workspace")),
                env: EnvVars::default(),
            },
        )
        .await
        .expect("step");
    let attached = recorder.artifacts("run-plugins").await.expect("artifacts").len();
    (outcome, attached)
}

#[tokio::test]
async fn test_workspace_path_with_glob_metacharacters() {
    let dir = TempTestDir::new("ws[1]");
    assert!(dir.path().to_string_lossy().contains("[1]"));
    test_plugins_workspace(&dir);

    let (outcome, attached) =
        publish_test_plugins(&dir, spy_log(TEST_PLUGINS_SPY_LOG, dir.path()).into()).await;
    assert_eq!(outcome.stats.artifacts_attached, 5);
    assert_eq!(attached, 5);
}

#[tokio::test]
async fn test_parsed_spy_log_publishes_like_xml() {
    let dir = TempTestDir::new("parsed_log");
    test_plugins_workspace(&dir);
    let log = parse_spy_log(&spy_log(TEST_PLUGINS_SPY_LOG, dir.path())).expect("parse");

    let (outcome, attached) = publish_test_plugins(&dir, log.into()).await;
    assert_eq!(outcome.result, StepResult::Unstable);
    assert_eq!(outcome.stats.artifacts_attached, 5);
    assert_eq!(attached, 5);
}

#[tokio::test]
async fn test_failsafe_failures_keep_messages() {
    let dir = TempTestDir::new("failsafe_messages");
    test_plugins_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(
        Arc::new(LocalWorkspace::new(dir.path()).expect("workspace")),
        "controller",
    );
    let log = parse_spy_log(&spy_log(TEST_PLUGINS_SPY_LOG, dir.path())).expect("parse");
    let failsafe = log
        .iter()
        .find(|e| e.plugin.artifact_id == "maven-failsafe-plugin")
        .expect("failsafe event");

    let outcome = TestReportPublisher::new()
        .process(&ctx, failsafe)
        .await
        .expect("process");
    assert_eq!(outcome.attached, 1);
    assert_eq!(outcome.test_failures, 2);

    let artifacts = harness.recorder.artifacts("run-1").await.expect("artifacts");
    let summary = summaries(&artifacts)[0];
    let messages: Vec<Option<String>> = summary
        .failing_cases()
        .into_iter()
        .map(|c| c.failure_message.clone())
        .collect();
    assert_eq!(
        messages,
        vec![
            Some("expected:<200> but was:<503>".to_string()),
            Some("java.lang.IllegalStateException: config missing".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_reports_directory_from_environment() {
    let dir = TempTestDir::new("env_reports");
    dir.create_file("custom/TEST-some.groupid.AnArtifactTest.xml", fixtures::SUREFIRE_REPORT);
    let harness = Harness::new();
    let mut ctx = harness.context(
        Arc::new(LocalWorkspace::new(dir.path()).expect("workspace")),
        "controller",
    );
    ctx.env = EnvVars::default().with("REPORTS_DIR", "custom");

    let log = parse_spy_log(
        r#"<mavenExecution>
             <ExecutionEvent type="MojoSucceeded" plugin-group-id="org.apache.maven.plugins" plugin-artifact-id="maven-surefire-plugin" goal="test" reportsDirectory="${REPORTS_DIR}"/>
           </mavenExecution>"#,
    )
    .expect("parse");
    let event = log.iter().next().expect("event");

    let outcome = TestReportPublisher::new()
        .process(&ctx, event)
        .await
        .expect("process");
    assert_eq!(outcome.attached, 1);
}

#[tokio::test]
async fn test_two_report_sets_of_one_node_are_separate_artifacts() {
    let dir = TempTestDir::new("two_sets");
    test_plugins_workspace(&dir);
    let harness = Harness::new();
    let ctx = harness.context(
        Arc::new(LocalWorkspace::new(dir.path()).expect("workspace")),
        "controller",
    );
    let log = parse_spy_log(&spy_log(TEST_PLUGINS_SPY_LOG, dir.path())).expect("parse");
    let publisher = TestReportPublisher::new();

    // core and bundle carry byte-identical reports under different paths
    for event in log.iter().filter(|e| e.plugin.goal == "test") {
        publisher.process(&ctx, event).await.expect("process");
    }
    assert_eq!(harness.recorder.artifacts("run-1").await.expect("artifacts").len(), 2);
}
