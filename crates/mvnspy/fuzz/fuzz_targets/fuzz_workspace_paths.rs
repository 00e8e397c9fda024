#![no_main]

//! Fuzz target for environment expansion and workspace confinement
//!
//! Whatever a spy log or environment variable expands to, a confined path
//! must stay under the workspace root.

use std::path::Path;

use libfuzzer_sys::fuzz_target;

use mvnspy::env::EnvVars;
use mvnspy::workspace::scope;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let env = EnvVars::default()
        .with("WORKSPACE", "/ws")
        .with("UP", "../..");
    let expanded = env.expand(s);

    let root = Path::new("/ws/job");
    if let Ok(confined) = scope::confine(root, &expanded) {
        assert!(confined.starts_with(root), "{expanded} escaped to {}", confined.display());
    }
});
