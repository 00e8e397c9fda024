// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Content fingerprints
//!
//! A fingerprint links a file's content hash to the build and node that
//! first produced or consumed it. Later builds that see the same content
//! get the original record back rather than a new one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recorder::RecorderError;

/// MD5 of `bytes`, lowercase hex
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Content-hash identity of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// MD5 of the file content
    pub content_hash: String,
    /// Run that first recorded this content
    pub origin_build_id: String,
    /// Node of the first recording
    pub origin_node_id: String,
    /// File name at first recording
    pub file_name: String,
    /// When the fingerprint was created
    pub created_at: DateTime<Utc>,
}

/// Where a fingerprint is being recorded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintOrigin {
    /// Run id
    pub build_id: String,
    /// Node id
    pub node_id: String,
    /// File name
    pub file_name: String,
}

impl Fingerprint {
    /// A new fingerprint created now from `origin`
    #[must_use]
    pub fn new(content_hash: &str, origin: &FingerprintOrigin) -> Self {
        Self {
            content_hash: content_hash.to_string(),
            origin_build_id: origin.build_id.clone(),
            origin_node_id: origin.node_id.clone(),
            file_name: origin.file_name.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Store of fingerprints keyed by content hash
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// Fingerprint for a hash, if recorded
    async fn get(&self, content_hash: &str) -> Result<Option<Fingerprint>, RecorderError>;

    /// Existing fingerprint for a hash, or a new one from `origin`
    async fn get_or_create(
        &self,
        content_hash: &str,
        origin: &FingerprintOrigin,
    ) -> Result<Fingerprint, RecorderError>;

    /// Number of fingerprints recorded
    async fn len(&self) -> Result<usize, RecorderError>;
}

/// In-memory fingerprint store that counts `get_or_create` calls
#[derive(Debug, Default)]
pub struct MemoryFingerprintStore {
    prints: Mutex<HashMap<String, Fingerprint>>,
    calls: AtomicUsize,
}

impl MemoryFingerprintStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get_or_create` calls received
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FingerprintStore for MemoryFingerprintStore {
    async fn get(&self, content_hash: &str) -> Result<Option<Fingerprint>, RecorderError> {
        let prints = self.prints.lock().map_err(|_| RecorderError::Poisoned)?;
        Ok(prints.get(content_hash).cloned())
    }

    async fn get_or_create(
        &self,
        content_hash: &str,
        origin: &FingerprintOrigin,
    ) -> Result<Fingerprint, RecorderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut prints = self.prints.lock().map_err(|_| RecorderError::Poisoned)?;
        let print = prints
            .entry(content_hash.to_string())
            .or_insert_with(|| {
                debug!(hash = %content_hash, file = %origin.file_name, "New fingerprint");
                Fingerprint::new(content_hash, origin)
            })
            .clone();
        Ok(print)
    }

    async fn len(&self) -> Result<usize, RecorderError> {
        let prints = self.prints.lock().map_err(|_| RecorderError::Poisoned)?;
        Ok(prints.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn origin(build: &str) -> FingerprintOrigin {
        FingerprintOrigin {
            build_id: build.to_string(),
            node_id: "node-1".to_string(),
            file_name: "app.jar".to_string(),
        }
    }

    #[test]
    fn test_md5_hex_known_values() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn test_get_or_create_keeps_first_origin() {
        let store = MemoryFingerprintStore::new();
        let first = store
            .get_or_create("abc", &origin("run-1"))
            .await
            .expect("create");
        let second = store
            .get_or_create("abc", &origin("run-2"))
            .await
            .expect("get");
        assert_eq!(first, second);
        assert_eq!(second.origin_build_id, "run-1");
        assert_eq!(store.len().await.expect("len"), 1);
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryFingerprintStore::new();
        assert!(store.get("nope").await.expect("get").is_none());
        assert_eq!(store.calls(), 0);
    }
}
