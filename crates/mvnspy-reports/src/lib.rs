// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! mvnspy-reports: JUnit test report processing for mvnspy
//!
//! This library crate parses the JUnit XML reports written by surefire,
//! failsafe, tycho and karma into [`TestResultSummary`] values for
//! consumption by the mvnspy test report publisher.
//!
//! # Example
//!
//! ```no_run
//! use mvnspy_reports::{TestResultSummary, parse_report_file};
//!
//! let a = parse_report_file("target/surefire-reports/TEST-com.example.ATest.xml").unwrap();
//! let b = parse_report_file("target/surefire-reports/TEST-com.example.BTest.xml").unwrap();
//! let merged = TestResultSummary::merged("maven-surefire-plugin:test", [a, b]);
//! println!("{} tests, {} failed", merged.total_count, merged.failure_count);
//! ```

pub mod error;
pub mod junit;
pub mod result;
pub mod summary;

pub use error::ReportError;
pub use junit::{ReportFormat, parse_report, parse_report_bytes, parse_report_file, parse_time_ms};
pub use result::{TestCaseResult, TestOutcome};
pub use summary::TestResultSummary;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::ReportError;
    pub use crate::junit::{ReportFormat, parse_report, parse_report_file};
    pub use crate::result::{TestCaseResult, TestOutcome};
    pub use crate::summary::TestResultSummary;
}
