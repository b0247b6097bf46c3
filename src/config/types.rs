use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_MAX_FILES: u32 = 10;

/// One layer of configuration (config file or environment)
///
/// Every field is optional so layers can be merged field by field. The
/// aliases accept the flat lowercase keys used by older `config.json` files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigLayer {
    #[serde(alias = "baseurl")]
    pub base_url: Option<String>,
    #[serde(alias = "spacekey")]
    pub space_key: Option<String>,
    pub token: Option<String>,
    #[serde(alias = "backupdir")]
    pub backup_dir: Option<PathBuf>,
    #[serde(alias = "timeout")]
    pub timeout_minutes: Option<u64>,
    #[serde(alias = "retentiondays")]
    pub retention_days: Option<i64>,

    pub tls_mode: Option<TlsMode>,
    pub ca_cert: Option<PathBuf>,

    pub poll_interval_seconds: Option<u64>,
    pub poll_max_attempts: Option<u32>,
    pub poll_deadline_minutes: Option<u64>,

    pub verify_archive: Option<bool>,
    pub resume_pending_job: Option<bool>,
    pub delete_after_upload: Option<bool>,

    #[serde(alias = "s3bucket")]
    pub s3_bucket: Option<String>,
    #[serde(alias = "s3keyprefix")]
    pub s3_key_prefix: Option<String>,
    #[serde(alias = "s3region")]
    pub s3_region: Option<String>,
    #[serde(alias = "s3accesskey")]
    pub s3_access_key: Option<String>,
    #[serde(alias = "s3secretkey")]
    pub s3_secret_key: Option<String>,
    pub s3_endpoint: Option<String>,

    pub log_directory: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_max_files: Option<u32>,
}

/// How the HTTP client validates the server certificate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Verify,
    Pinned,
    Insecure,
}

impl std::str::FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "verify" => Ok(TlsMode::Verify),
            "pinned" => Ok(TlsMode::Pinned),
            "insecure" => Ok(TlsMode::Insecure),
            other => Err(format!(
                "unknown TLS mode '{}' (expected verify, pinned or insecure)",
                other
            )),
        }
    }
}

/// Resolved trust policy for the remote channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// System/webpki roots
    Verify,
    /// Only the CA certificate at this PEM path is trusted
    Pinned(PathBuf),
    /// Certificate validation disabled
    Insecure,
}

/// A credential that never shows up in logs or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// Poll loop settings as configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

/// Remote object storage target for finished archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub key_prefix: String,
    pub region: Option<String>,
    pub access_key: Option<Secret>,
    pub secret_key: Option<Secret>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// File logging is enabled only when a directory is configured
    pub directory: Option<PathBuf>,
    pub level: String,
    pub max_files: u32,
}

/// Effective configuration for one backup cycle (read-only once built)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleConfig {
    pub base_url: String,
    pub space_key: String,
    pub token: Secret,
    pub backup_dir: PathBuf,
    pub request_timeout: Duration,
    /// `<= 0` disables cleanup
    pub retention_days: i64,
    pub tls: TlsPolicy,
    pub poll: PollSettings,
    pub verify_archive: bool,
    pub resume_pending_job: bool,
    pub delete_after_upload: bool,
    pub s3: Option<S3Settings>,
    pub logging: LogSettings,
}
