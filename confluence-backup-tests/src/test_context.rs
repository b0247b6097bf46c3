//! Test context and harness
//!
//! Provides a temporary backup directory with helpers for seeding
//! archives of a given age.

use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context with a temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Create a file whose modification time is `modified`
    pub fn create_file_modified_at(&self, name: &str, modified: DateTime<Utc>) -> PathBuf {
        let path = self.create_file(name, "archive");
        let file = fs::File::options()
            .write(true)
            .open(&path)
            .expect("Failed to open file");
        file.set_modified(SystemTime::from(modified))
            .expect("Failed to set modification time");
        path
    }

    /// Create a file last modified `days` days before `now`
    pub fn create_file_aged(&self, name: &str, now: DateTime<Utc>, days: i64) -> PathBuf {
        self.create_file_modified_at(name, now - Duration::days(days))
    }

    /// Check if a file exists in the temp directory
    pub fn file_exists(&self, name: &str) -> bool {
        self.temp_dir.path().join(name).exists()
    }

    /// Sorted names of everything in the temp directory
    pub fn list_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.temp_dir.path())
            .expect("Failed to read temp dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for std::result::Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
