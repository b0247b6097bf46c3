//! Fluent API for building test configurations
//!
//! Every builder owns a temporary directory that doubles as the backup
//! directory, so cycles built from it never touch the real filesystem.

use confluence_backup::config::{merge_config, ConfigLayer, CycleConfig, TlsMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_BASE_URL: &str = "https://wiki.example.com";
pub const TEST_SPACE_KEY: &str = "OPS";
pub const TEST_TOKEN: &str = "test-token-123";

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    layer: ConfigLayer,
}

impl ConfigBuilder {
    /// Create a builder with the required fields filled in
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backup_dir = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_dir).expect("Failed to create backup dir");

        let layer = ConfigLayer {
            base_url: Some(TEST_BASE_URL.to_string()),
            space_key: Some(TEST_SPACE_KEY.to_string()),
            token: Some(TEST_TOKEN.to_string()),
            backup_dir: Some(backup_dir),
            ..Default::default()
        };

        Self { temp_dir, layer }
    }

    /// Create a builder with no fields set (only the temp dir)
    pub fn empty() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            layer: ConfigLayer::default(),
        }
    }

    pub fn with_space(mut self, space_key: &str) -> Self {
        self.layer.space_key = Some(space_key.to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.layer.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.layer.retention_days = Some(days);
        self
    }

    pub fn with_timeout_minutes(mut self, minutes: u64) -> Self {
        self.layer.timeout_minutes = Some(minutes);
        self
    }

    pub fn with_tls_mode(mut self, mode: TlsMode) -> Self {
        self.layer.tls_mode = Some(mode);
        self
    }

    pub fn with_verify_archive(mut self, verify: bool) -> Self {
        self.layer.verify_archive = Some(verify);
        self
    }

    pub fn with_resume_pending_job(mut self, resume: bool) -> Self {
        self.layer.resume_pending_job = Some(resume);
        self
    }

    pub fn with_s3_bucket(mut self, bucket: &str, prefix: &str) -> Self {
        self.layer.s3_bucket = Some(bucket.to_string());
        self.layer.s3_key_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_log_dir(mut self, path: &Path) -> Self {
        self.layer.log_directory = Some(path.to_path_buf());
        self
    }

    /// Drop a field (for missing-field tests)
    pub fn without_token(mut self) -> Self {
        self.layer.token = None;
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backup directory path
    pub fn backup_dir(&self) -> PathBuf {
        self.layer
            .backup_dir
            .clone()
            .unwrap_or_else(|| self.temp_dir.path().to_path_buf())
    }

    /// The file layer as configured so far
    pub fn layer(&self) -> &ConfigLayer {
        &self.layer
    }

    /// Write the layer as TOML into the temp dir and return its path
    pub fn write_toml(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let contents = toml::to_string_pretty(&self.layer).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config file");
        path
    }

    /// Write the layer as JSON into the temp dir and return its path
    pub fn write_json(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let contents =
            serde_json::to_string_pretty(&self.layer).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config file");
        path
    }

    /// Build the effective configuration (no environment layer)
    pub fn build(self) -> CycleConfig {
        self.persist().0
    }

    /// Keep the temp directory alive alongside the config
    pub fn persist(self) -> (CycleConfig, TempDir) {
        let config =
            merge_config(self.layer, ConfigLayer::default()).expect("Test config should be valid");
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
