// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for mvnspy-reports

use thiserror::Error;

/// Errors that can occur during test report processing
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report is not well-formed XML
    #[error("XML error at position {position}: {source}")]
    Xml {
        /// Byte offset reported by the reader
        position: u64,
        /// Underlying reader error
        #[source]
        source: quick_xml::Error,
    },

    /// Error reading the report file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The report is XML but not a JUnit test report
    #[error("Invalid test report format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },
}
