// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test utilities for mvnspy integration tests
//!
//! Scratch workspaces on the local filesystem, cleaned up on drop.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime};

/// Counter for generating unique test directory names
static TEST_DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A temporary directory that is removed when dropped
///
/// The path is canonical, so it matches what `LocalWorkspace` reports on
/// platforms where the temp directory sits behind a symlink.
pub struct TempTestDir {
    path: PathBuf,
    cleanup: bool,
}

impl TempTestDir {
    /// Create a unique directory for `test_name`
    pub fn new(test_name: &str) -> Self {
        let counter = TEST_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir_name = format!("mvnspy-test-{}-{}-{}", test_name, std::process::id(), counter);
        let path = std::env::temp_dir().join(dir_name);
        fs::create_dir_all(&path).expect("Failed to create temp test directory");
        let path = fs::canonicalize(&path).expect("Failed to canonicalize temp test directory");

        Self {
            path,
            cleanup: true,
        }
    }

    /// Keep the directory after the test (for debugging)
    pub fn new_persistent(test_name: &str) -> Self {
        let mut temp = Self::new(test_name);
        temp.cleanup = false;
        eprintln!("Persistent temp dir: {}", temp.path.display());
        temp
    }

    /// Path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a file, with parent directories
    pub fn create_file(&self, relative_path: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let file_path = self.path.join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Push a file's modification time into the past
    pub fn age_file(&self, relative_path: &str, age: Duration) {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(self.path.join(relative_path))
            .expect("Failed to open file");
        let modified = SystemTime::now()
            .checked_sub(age)
            .expect("Age should be representable");
        file.set_modified(modified).expect("Failed to set modification time");
    }

    /// Check if a file exists
    pub fn file_exists(&self, relative_path: &str) -> bool {
        self.path.join(relative_path).exists()
    }
}

impl Drop for TempTestDir {
    fn drop(&mut self) {
        if self.cleanup {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
