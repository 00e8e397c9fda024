// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! JUnit XML report parsing
//!
//! Surefire, failsafe and tycho write one `TEST-*.xml` file per test class.
//! Karma's junit reporter (also driven through frontend-maven-plugin) writes
//! the same schema, usually wrapped in a `<testsuites>` root. All of them
//! normalise to a [`TestResultSummary`].
//!
//! # Example
//!
//! ```
//! use mvnspy_reports::parse_report;
//!
//! let xml = r#"<testsuite name="some.groupid.AnArtifactTest" time="0.02" tests="1">
//!   <testcase name="testApp" classname="some.groupid.AnArtifactTest" time="0.01"/>
//! </testsuite>"#;
//!
//! let summary = parse_report(xml).unwrap();
//! assert_eq!(summary.total_count, 1);
//! ```

use crate::error::ReportError;
use crate::result::{TestCaseResult, TestOutcome};
use crate::summary::TestResultSummary;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// ============================================================================
// Report formats
// ============================================================================

/// Tools whose reports share the JUnit schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// maven-surefire-plugin unit tests
    Surefire,
    /// maven-failsafe-plugin integration tests
    Failsafe,
    /// tycho-surefire-plugin OSGi tests
    Tycho,
    /// maven-karma-plugin JavaScript tests
    Karma,
    /// frontend-maven-plugin running karma
    Frontend,
}

impl ReportFormat {
    /// Directory name used under the build directory when none is configured
    #[must_use]
    pub fn default_directory(&self) -> &'static str {
        match self {
            Self::Surefire | Self::Tycho => "surefire-reports",
            Self::Failsafe => "failsafe-reports",
            Self::Karma | Self::Frontend => "karma-reports",
        }
    }

    /// Glob matching report files inside the report directory
    ///
    /// Failsafe also writes `failsafe-summary.xml`, which is not a JUnit
    /// report, hence the `TEST-` prefix.
    #[must_use]
    pub fn file_glob(&self) -> &'static str {
        match self {
            Self::Surefire | Self::Failsafe | Self::Tycho => "TEST-*.xml",
            Self::Karma | Self::Frontend => "*.xml",
        }
    }
}

// ============================================================================
// Parsing Functions
// ============================================================================

/// Parse a JUnit XML report
///
/// A `<testsuites>` document is folded into a single summary named after
/// its first suite.
///
/// # Errors
///
/// Returns `ReportError::Xml` if the document is not well-formed and
/// `ReportError::InvalidFormat` if its root is not `<testsuite>` or
/// `<testsuites>`.
pub fn parse_report(xml: &str) -> Result<TestResultSummary, ReportError> {
    let xml = xml.trim_start_matches('\u{feff}');
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = ParseState::default();

    loop {
        let event = reader.read_event().map_err(|source| ReportError::Xml {
            position: reader.buffer_position() as u64,
            source,
        })?;
        let position = reader.buffer_position() as u64;

        match event {
            Event::Start(start) => {
                state.depth += 1;
                state.open(&start, false, position)?;
            }
            Event::Empty(start) => state.open(&start, true, position)?,
            Event::End(end) => {
                state.depth = state.depth.saturating_sub(1);
                state.close(end.local_name().as_ref());
            }
            Event::Text(text) => {
                if state.collecting {
                    let text = text
                        .unescape()
                        .map_err(|source| ReportError::Xml { position, source })?;
                    state.detail.push_str(&text);
                }
            }
            Event::CData(data) => {
                if state.collecting {
                    state
                        .detail
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    state.finish()
}

/// Parse a report from raw bytes, tolerating a UTF-8 byte order mark
///
/// # Errors
///
/// Returns `ReportError::InvalidFormat` if the bytes are not UTF-8,
/// otherwise the same errors as [`parse_report`].
pub fn parse_report_bytes(bytes: &[u8]) -> Result<TestResultSummary, ReportError> {
    let xml = std::str::from_utf8(bytes).map_err(|e| ReportError::InvalidFormat {
        message: format!("report is not UTF-8: {e}"),
    })?;
    parse_report(xml)
}

/// Read and parse a report file
///
/// # Errors
///
/// Returns `ReportError::Io` if the file cannot be read.
pub fn parse_report_file(path: impl AsRef<Path>) -> Result<TestResultSummary, ReportError> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_report_bytes(&bytes)
}

/// Parse a JUnit `time` attribute into milliseconds
///
/// Older surefire versions format times with a grouping separator
/// (`1,234.5`); empty or unreadable values count as zero.
#[must_use]
pub fn parse_time_ms(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => (secs * 1000.0).round() as u64,
        _ => 0,
    }
}

#[derive(Default)]
struct ParseState {
    root_seen: bool,
    depth: usize,
    suites_name: Option<String>,
    suite_name: Option<String>,
    suite_time_ms: Option<u64>,
    cases: Vec<TestCaseResult>,
    current: Option<TestCaseResult>,
    collecting: bool,
    detail: String,
}

impl ParseState {
    fn open(&mut self, start: &BytesStart<'_>, empty: bool, position: u64) -> Result<(), ReportError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        if !self.root_seen {
            if name != "testsuite" && name != "testsuites" {
                return Err(ReportError::InvalidFormat {
                    message: format!("unexpected root element <{name}>"),
                });
            }
            self.root_seen = true;
        }

        match name.as_str() {
            "testsuites" => {
                let attrs = attributes(start, position)?;
                if self.suites_name.is_none() {
                    self.suites_name = attrs.get("name").cloned();
                }
            }
            "testsuite" => {
                let attrs = attributes(start, position)?;
                if self.suite_name.is_none() {
                    self.suite_name = attrs.get("name").cloned();
                }
                if let Some(time) = attrs.get("time") {
                    *self.suite_time_ms.get_or_insert(0) += parse_time_ms(time);
                }
            }
            "testcase" => {
                let attrs = attributes(start, position)?;
                let mut case = TestCaseResult::passed(
                    attrs.get("name").map(String::as_str).unwrap_or_default(),
                    attrs.get("time").map(|t| parse_time_ms(t)).unwrap_or(0),
                );
                case.class_name = attrs.get("classname").cloned();
                if empty {
                    self.cases.push(case);
                } else {
                    self.current = Some(case);
                }
            }
            "failure" | "error" | "skipped" => {
                let Some(ref mut case) = self.current else {
                    return Ok(());
                };
                let attrs = attributes(start, position)?;
                let outcome = match name.as_str() {
                    "failure" => TestOutcome::Failed,
                    "error" => TestOutcome::Errored,
                    _ => TestOutcome::Skipped,
                };
                // A skip marker never hides a failure recorded for the same case
                if outcome != TestOutcome::Skipped || !case.is_failure() {
                    case.outcome = outcome;
                    case.failure_message = attrs.get("message").cloned();
                }
                if !empty && outcome != TestOutcome::Skipped {
                    self.collecting = true;
                    self.detail.clear();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"failure" | b"error" if self.collecting => {
                self.collecting = false;
                if let Some(ref mut case) = self.current
                    && case.failure_message.is_none()
                {
                    let first_line = self.detail.trim().lines().next().unwrap_or_default();
                    if !first_line.is_empty() {
                        case.failure_message = Some(first_line.to_string());
                    }
                }
            }
            b"testcase" => {
                if let Some(case) = self.current.take() {
                    self.cases.push(case);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<TestResultSummary, ReportError> {
        if !self.root_seen {
            return Err(ReportError::InvalidFormat {
                message: "document has no <testsuite> element".to_string(),
            });
        }
        if self.depth > 0 {
            return Err(ReportError::InvalidFormat {
                message: format!("report is truncated ({} unclosed elements)", self.depth),
            });
        }
        let suite_name = self.suite_name.or(self.suites_name).unwrap_or_default();
        let summary = match self.suite_time_ms {
            Some(ms) => TestResultSummary::with_duration(&suite_name, self.cases, ms),
            None => TestResultSummary::from_cases(&suite_name, self.cases),
        };
        debug!(
            suite = %summary.suite_name,
            total = summary.total_count,
            failures = summary.failure_count,
            "Parsed test report"
        );
        Ok(summary)
    }
}

fn attributes(start: &BytesStart<'_>, position: u64) -> Result<HashMap<String, String>, ReportError> {
    let mut map = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ReportError::Xml {
            position,
            source: quick_xml::Error::from(e),
        })?;
        let value = attr
            .unescape_value()
            .map_err(|source| ReportError::Xml { position, source })?;
        map.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        );
    }
    Ok(map)
}
