// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! mvnspy-events: Maven spy log processing for mvnspy
//!
//! This library crate parses the XML execution trace written by the Maven
//! spy into an ordered tree of [`ExecutionEvent`]s for consumption by the
//! mvnspy publishers.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use mvnspy_events::parse_spy_log_file;
//!
//! let log = parse_spy_log_file("target/maven-spy.log").expect("parse spy log");
//! for event in &log {
//!     println!("{} ({:?})", event.triple(), event.event_type);
//! }
//! ```

pub mod error;
pub mod event;
pub mod parser;

pub use error::SpyLogError;
pub use event::{
    ArtifactRef, ExecutionEvent, GoalTriple, MOJO_STARTED, PluginCoordinates, ProjectCoordinates,
    SpyLog,
};
pub use parser::{parse_spy_log, parse_spy_log_file};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::SpyLogError;
    pub use crate::event::{ExecutionEvent, GoalTriple, SpyLog};
    pub use crate::parser::{parse_spy_log, parse_spy_log_file};
}
