//! Test result types

use serde::{Deserialize, Serialize};

/// Result of a single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Test case name
    pub name: String,
    /// Class (or describe block) the case belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Test outcome
    pub outcome: TestOutcome,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Failure, error or skip message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl TestCaseResult {
    /// Create a passing case
    #[must_use]
    pub fn passed(name: &str, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            class_name: None,
            outcome: TestOutcome::Passed,
            duration_ms,
            failure_message: None,
        }
    }

    /// Set the class name
    #[must_use]
    pub fn in_class(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    /// Set a non-passing outcome with its message
    #[must_use]
    pub fn with_outcome(mut self, outcome: TestOutcome, message: Option<&str>) -> Self {
        self.outcome = outcome;
        self.failure_message = message.map(str::to_string);
        self
    }

    /// `class.name`, or just the name when the class is unknown
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.class_name {
            Some(ref class) if !class.is_empty() => format!("{class}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Check if the case failed or errored
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, TestOutcome::Failed | TestOutcome::Errored)
    }
}

/// Possible test outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// Test passed
    Passed,
    /// An assertion failed (`<failure>`)
    Failed,
    /// The test threw an unexpected error (`<error>`)
    Errored,
    /// Test was skipped (`<skipped>`)
    Skipped,
}
