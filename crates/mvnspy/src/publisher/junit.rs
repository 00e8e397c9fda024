// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test report publisher
//!
//! Collects the JUnit reports written by a test goal, merges them into one
//! summary and attaches it to the run. Covers surefire, failsafe, tycho and
//! the two karma adapters, which all write the JUnit schema.

use async_trait::async_trait;
use chrono::TimeDelta;
use tracing::{debug, info};

use super::{PublishError, PublishOutcome, Publisher, PublisherKind, attach_once};
use crate::classifier::test_report_triples;
use crate::context::PublisherContext;
use crate::fingerprint::md5_hex;
use crate::recorder::ArtifactPayload;
use crate::workspace::{ReportFile, scope};
use mvnspy_events::{ExecutionEvent, GoalTriple};
use mvnspy_reports::{ReportFormat, TestResultSummary, parse_report_bytes};

/// Job configuration id
pub const ID: &str = "junitPublisher";

/// Reports last modified more than this many seconds before the run
/// started are stale
pub const STALE_TOLERANCE_SECS: i64 = 3;

/// Warning logged when every matching report predates the run
pub const NO_NEW_REPORTS: &str = "Test reports were found but none of them are new";

/// Publishes JUnit test reports
#[derive(Debug, Clone)]
pub struct TestReportPublisher {
    interests: Vec<GoalTriple>,
}

impl Default for TestReportPublisher {
    fn default() -> Self {
        Self {
            interests: test_report_triples(),
        }
    }
}

impl TestReportPublisher {
    /// Create the publisher with its default interests
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Report flavour written by the plugin of `event`
#[must_use]
pub fn report_format(event: &ExecutionEvent) -> ReportFormat {
    match event.plugin.artifact_id.as_str() {
        "maven-failsafe-plugin" => ReportFormat::Failsafe,
        "tycho-surefire-plugin" => ReportFormat::Tycho,
        "maven-karma-plugin" => ReportFormat::Karma,
        "frontend-maven-plugin" => ReportFormat::Frontend,
        _ => ReportFormat::Surefire,
    }
}

/// Directory and file-name glob of the reports written by `event`, before
/// environment expansion
///
/// Returns `None` when the reports directory still refers to project
/// properties the spy log did not record.
#[must_use]
pub fn report_location(event: &ExecutionEvent) -> Option<(String, &'static str)> {
    let format = report_format(event);
    let directory = event.resolved_attribute("reportsDirectory").unwrap_or_else(|| {
        event.resolve_placeholders(&format!(
            "${{project.build.directory}}/{}",
            format.default_directory()
        ))
    });
    if directory.contains("${project.") || directory.contains("${basedir}") {
        return None;
    }
    let directory = directory.trim_end_matches(['/', '\\']).to_string();
    Some((directory, format.file_glob()))
}

/// Glob of the reports written by `event`, for display
#[must_use]
pub fn report_pattern(event: &ExecutionEvent) -> Option<String> {
    report_location(event).map(|(directory, file_glob)| format!("{directory}/{file_glob}"))
}

/// Artifact key identifying one set of reports from one node
fn summary_key(node_id: &str, reports: &[(String, String)]) -> String {
    let mut identity = String::from(node_id);
    let mut sorted: Vec<&(String, String)> = reports.iter().collect();
    sorted.sort();
    for (path, content_hash) in sorted {
        identity.push('\n');
        identity.push_str(path);
        identity.push(':');
        identity.push_str(content_hash);
    }
    format!("junit:{node_id}:{}", md5_hex(identity.as_bytes()))
}

#[async_trait]
impl Publisher for TestReportPublisher {
    fn kind(&self) -> PublisherKind {
        PublisherKind::TestReports
    }

    fn id(&self) -> &'static str {
        ID
    }

    fn interests(&self) -> &[GoalTriple] {
        &self.interests
    }

    async fn process(
        &self,
        ctx: &PublisherContext,
        event: &ExecutionEvent,
    ) -> Result<PublishOutcome, PublishError> {
        let triple = event.triple();
        let (directory, file_glob) = report_location(event).ok_or_else(|| PublishError::Incomplete {
            triple: triple.to_string(),
            message: "reports directory depends on an unknown project".to_string(),
        })?;
        let directory = ctx.env.expand(&directory);
        let pattern = format!("{directory}/{file_glob}");
        debug!(goal = %triple, pattern = %pattern, "Looking for test reports");

        let mut outcome = PublishOutcome::default();
        let found = match scope::dir_glob(ctx.workspace.root(), &directory, file_glob) {
            Ok(relative) => ctx.workspace.glob(&relative).await,
            Err(e) => Err(e),
        };
        let files = match found {
            Ok(files) => files,
            Err(e) if e.is_no_match() => {
                ctx.log.warn(format!("Cannot look for test reports {pattern}: {e}"));
                return Ok(PublishOutcome::warning());
            }
            Err(e) => return Err(e.into()),
        };
        if files.is_empty() {
            debug!(pattern = %pattern, "No test reports found");
            return Ok(outcome);
        }

        let threshold = ctx.run.started_at - TimeDelta::seconds(STALE_TOLERANCE_SECS);
        let found = files.len();
        let fresh: Vec<ReportFile> = files
            .into_iter()
            .filter(|f| f.last_modified_at.is_none_or(|modified| modified >= threshold))
            .collect();
        if fresh.is_empty() {
            ctx.log.warn(format!("{NO_NEW_REPORTS} ({found} in {pattern})"));
            return Ok(PublishOutcome::warning());
        }

        let mut summaries = Vec::with_capacity(fresh.len());
        let mut identity = Vec::with_capacity(fresh.len());
        for file in &fresh {
            let bytes = match ctx.workspace.read(file).await {
                Ok(bytes) => bytes,
                Err(e) if e.is_no_match() => {
                    ctx.log
                        .warn(format!("Cannot read test report {}: {e}", file.logical_path));
                    outcome.warnings += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            match parse_report_bytes(&bytes) {
                Ok(summary) => {
                    identity.push((file.logical_path.clone(), md5_hex(&bytes)));
                    summaries.push(summary);
                }
                Err(e) => {
                    ctx.log
                        .warn(format!("Skipping test report {}: {e}", file.logical_path));
                    outcome.warnings += 1;
                }
            }
        }
        if summaries.is_empty() {
            return Ok(outcome);
        }

        let suite_name = format!("{}:{}", event.plugin.artifact_id, event.plugin.goal);
        let summary = TestResultSummary::merged(&suite_name, summaries);
        outcome.test_failures = summary.failure_count;
        ctx.log.info(format!(
            "{suite_name}: {} tests, {} failures, {} skipped in {} reports",
            summary.total_count,
            summary.failure_count,
            summary.skipped_count,
            identity.len()
        ));

        let key = summary_key(&ctx.node_id, &identity);
        let attached = attach_once(ctx, key, ArtifactPayload::TestResults(summary)).await?;
        info!(
            run_id = %ctx.run.id,
            node_id = %ctx.node_id,
            suite = %suite_name,
            outcome = ?attached,
            "Published test results"
        );
        outcome.record(attached);
        Ok(outcome)
    }
}
