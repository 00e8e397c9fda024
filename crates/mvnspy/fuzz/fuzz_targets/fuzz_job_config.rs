#![no_main]

//! Fuzz target for job configuration parsing
//!
//! Arbitrary input must never panic, and any configuration that parses
//! must resolve against the default registry.

use libfuzzer_sys::fuzz_target;

use mvnspy::config::JobConfig;
use mvnspy::registry::PublisherRegistry;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(job) = JobConfig::from_json(s)
    {
        let registry = PublisherRegistry::with_defaults();
        let resolved = registry.resolve(&job);
        assert!(resolved.len() <= registry.publishers().len());

        let json = serde_json::to_string(&job).expect("serialize");
        let back = JobConfig::from_json(&json).expect("reparse");
        assert_eq!(back, job);
    }
});
