// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Integration tests for mvnspy-reports
//!
//! These tests parse report files in the layouts surefire, failsafe and
//! karma leave behind in a module's build directory.

use mvnspy_reports::{
    ReportError, ReportFormat, TestOutcome, TestResultSummary, parse_report, parse_report_file,
};
use proptest::prelude::*;
use std::path::{Path, PathBuf};

/// Get the fixtures directory for test data
fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    Path::new(&manifest_dir).join("tests/fixtures")
}

#[test]
fn test_surefire_report_fixture() {
    let path = fixtures_dir().join("surefire-reports/TEST-some.groupid.AnArtifactTest.xml");
    let summary = parse_report_file(&path).expect("Failed to parse surefire fixture");

    assert_eq!(summary.suite_name, "some.groupid.AnArtifactTest");
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.failure_count, 0);
    assert_eq!(summary.skipped_count, 0);
    assert_eq!(summary.duration_ms, 28);
    assert!(summary.all_passed());
    assert_eq!(
        summary.cases[0].full_name(),
        "some.groupid.AnArtifactTest.testApp"
    );
}

#[test]
fn test_failsafe_report_fixture() {
    let path = fixtures_dir().join("failsafe-reports/TEST-some.groupid.AnArtifactIT.xml");
    let summary = parse_report_file(&path).expect("Failed to parse failsafe fixture");

    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.failure_count, 2);
    assert_eq!(summary.cases[0].outcome, TestOutcome::Failed);
    assert_eq!(summary.cases[1].outcome, TestOutcome::Errored);
    assert_eq!(
        summary.cases[1].failure_message.as_deref(),
        Some("java.lang.IllegalStateException: config missing")
    );
}

#[test]
fn test_failsafe_summary_is_not_a_report() {
    let path = fixtures_dir().join("failsafe-reports/failsafe-summary.xml");
    let result = parse_report_file(&path);
    assert!(
        matches!(result, Err(ReportError::InvalidFormat { .. })),
        "failsafe-summary.xml should be rejected, got {result:?}"
    );
}

#[test]
fn test_karma_report_fixture() {
    let path = fixtures_dir().join("karma-reports/TEST-karma.xml");
    let summary = parse_report_file(&path).expect("Failed to parse karma fixture");

    assert_eq!(summary.suite_name, "PhantomJS 2.1.1 (Linux 0.0.0)");
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.skipped_count, 1);
    assert_eq!(summary.passed_count(), 2);
    assert_eq!(summary.duration_ms, 12);
}

#[test]
fn test_truncated_report_fixture() {
    let path = fixtures_dir().join("TEST-truncated.xml");
    let result = parse_report_file(&path);
    assert!(result.is_err(), "Truncated report should not parse");
}

#[test]
fn test_missing_file_is_io_error() {
    let result = parse_report_file(fixtures_dir().join("does-not-exist.xml"));
    assert!(matches!(result, Err(ReportError::Io(_))));
}

#[test]
fn test_merge_surefire_and_failsafe() {
    let unit = parse_report_file(
        fixtures_dir().join("surefire-reports/TEST-some.groupid.AnArtifactTest.xml"),
    )
    .expect("Failed to parse surefire fixture");
    let it = parse_report_file(
        fixtures_dir().join("failsafe-reports/TEST-some.groupid.AnArtifactIT.xml"),
    )
    .expect("Failed to parse failsafe fixture");

    let merged = TestResultSummary::merged("maven-surefire-plugin:test", [unit, it]);
    assert_eq!(merged.suite_name, "maven-surefire-plugin:test");
    assert_eq!(merged.total_count, 5);
    assert_eq!(merged.failure_count, 2);
    assert_eq!(merged.duration_ms, 28 + 1204);
}

#[test]
fn test_report_format_globs_match_fixture_layout() {
    for (format, file) in [
        (ReportFormat::Surefire, "TEST-some.groupid.AnArtifactTest.xml"),
        (ReportFormat::Failsafe, "TEST-some.groupid.AnArtifactIT.xml"),
        (ReportFormat::Karma, "TEST-karma.xml"),
    ] {
        let path = fixtures_dir().join(format.default_directory()).join(file);
        assert!(path.exists(), "{format:?} fixture missing at {}", path.display());
    }
}

#[test]
fn test_summary_serializes_to_json() {
    let summary = parse_report(
        r#"<testsuite name="s"><testcase name="a" classname="C"><skipped/></testcase></testsuite>"#,
    )
    .expect("Should parse");
    let json = serde_json::to_value(&summary).expect("Should serialize");
    assert_eq!(json["cases"][0]["outcome"], "skipped");
    assert_eq!(json["skipped_count"], 1);
}

// ============================================================================
// Property-based tests
// ============================================================================

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,12}"
}

proptest! {
    #[test]
    fn prop_generated_reports_keep_their_counts(
        cases in prop::collection::vec((name_strategy(), 0u8..4, 0u32..5_000), 0..30)
    ) {
        let mut xml = String::from(r#"<testsuite name="generated">"#);
        let mut failures = 0;
        let mut skipped = 0;
        for (name, kind, ms) in &cases {
            let secs = f64::from(*ms) / 1000.0;
            match *kind {
                0 => xml.push_str(&format!(r#"<testcase name="{name}" time="{secs}"/>"#)),
                1 => {
                    failures += 1;
                    xml.push_str(&format!(r#"<testcase name="{name}" time="{secs}"><failure message="m"/></testcase>"#));
                }
                2 => {
                    failures += 1;
                    xml.push_str(&format!(r#"<testcase name="{name}" time="{secs}"><error>boom</error></testcase>"#));
                }
                _ => {
                    skipped += 1;
                    xml.push_str(&format!(r#"<testcase name="{name}" time="{secs}"><skipped/></testcase>"#));
                }
            }
        }
        xml.push_str("</testsuite>");

        let summary = parse_report(&xml).expect("generated report should parse");
        prop_assert_eq!(summary.total_count, cases.len());
        prop_assert_eq!(summary.failure_count, failures);
        prop_assert_eq!(summary.skipped_count, skipped);
        let expected_ms: u64 = cases.iter().map(|(_, _, ms)| u64::from(*ms)).sum();
        prop_assert_eq!(summary.duration_ms, expected_ms);
    }

    #[test]
    fn prop_parser_never_panics(input in ".{0,400}") {
        let _ = parse_report(&input);
    }
}
