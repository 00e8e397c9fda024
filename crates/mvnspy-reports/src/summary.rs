//! Aggregated test results
//!
//! Counts are always derived from the case list, so
//! `total_count == passed + failed + skipped` holds for every summary this
//! module hands out.

use crate::result::{TestCaseResult, TestOutcome};
use serde::{Deserialize, Serialize};

/// Aggregated results of one or more report files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSummary {
    /// Suite name
    pub suite_name: String,
    /// Number of test cases
    pub total_count: usize,
    /// Failed and errored cases
    pub failure_count: usize,
    /// Skipped cases
    pub skipped_count: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Individual case results, in report order
    pub cases: Vec<TestCaseResult>,
}

impl TestResultSummary {
    /// Create an empty summary
    #[must_use]
    pub fn empty(suite_name: &str) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            total_count: 0,
            failure_count: 0,
            skipped_count: 0,
            duration_ms: 0,
            cases: Vec::new(),
        }
    }

    /// Build a summary whose duration is the sum of its cases
    #[must_use]
    pub fn from_cases(suite_name: &str, cases: Vec<TestCaseResult>) -> Self {
        let duration_ms = cases.iter().map(|c| c.duration_ms).sum();
        Self::with_duration(suite_name, cases, duration_ms)
    }

    /// Build a summary with an explicitly reported duration
    #[must_use]
    pub fn with_duration(suite_name: &str, cases: Vec<TestCaseResult>, duration_ms: u64) -> Self {
        let mut summary = Self::empty(suite_name);
        summary.cases = cases;
        summary.duration_ms = duration_ms;
        summary.recount();
        summary
    }

    /// Number of passed cases
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.total_count - self.failure_count - self.skipped_count
    }

    /// Check if no case failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failure_count == 0
    }

    /// Get failing (failed or errored) cases
    #[must_use]
    pub fn failing_cases(&self) -> Vec<&TestCaseResult> {
        self.cases.iter().filter(|c| c.is_failure()).collect()
    }

    /// Fold another summary into this one, keeping this suite name
    pub fn merge(&mut self, other: TestResultSummary) {
        self.duration_ms += other.duration_ms;
        self.cases.extend(other.cases);
        self.recount();
    }

    /// Merge any number of summaries under a new suite name
    #[must_use]
    pub fn merged(suite_name: &str, summaries: impl IntoIterator<Item = TestResultSummary>) -> Self {
        let mut merged = Self::empty(suite_name);
        for summary in summaries {
            merged.merge(summary);
        }
        merged
    }

    fn recount(&mut self) {
        self.total_count = self.cases.len();
        self.failure_count = self.cases.iter().filter(|c| c.is_failure()).count();
        self.skipped_count = self
            .cases
            .iter()
            .filter(|c| c.outcome == TestOutcome::Skipped)
            .count();
    }
}
