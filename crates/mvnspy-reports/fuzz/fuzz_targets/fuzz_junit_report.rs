// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for JUnit report parsing

#![no_main]

use libfuzzer_sys::fuzz_target;

use mvnspy_reports::parse_report_bytes;

fuzz_target!(|data: &[u8]| {
    if let Ok(summary) = parse_report_bytes(data) {
        assert_eq!(
            summary.total_count,
            summary.passed_count() + summary.failure_count + summary.skipped_count
        );
    }
});
