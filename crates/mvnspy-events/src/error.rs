// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for mvnspy-events

use thiserror::Error;

/// Errors that can occur while reading a spy log
#[derive(Debug, Error)]
pub enum SpyLogError {
    /// The document is not well-formed XML
    #[error("XML error at position {position}: {source}")]
    Xml {
        /// Byte offset reported by the reader
        position: u64,
        /// Underlying reader error
        #[source]
        source: quick_xml::Error,
    },

    /// The document is XML but lacks required structure
    #[error("Malformed spy log: {message}")]
    Malformed {
        /// Description of the structural problem
        message: String,
    },

    /// Error reading the spy log file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpyLogError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
