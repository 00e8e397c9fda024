// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for spy log parsing
//!
//! `parse_spy_log` must return an error, never panic, on arbitrary input.

#![no_main]

use libfuzzer_sys::fuzz_target;

use mvnspy_events::parse_spy_log;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data)
        && let Ok(log) = parse_spy_log(input)
    {
        // Document-order walk must visit every parsed event exactly once
        assert_eq!(log.iter().count(), log.len());
    }
});
