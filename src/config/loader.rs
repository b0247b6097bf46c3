use super::types::*;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON config file: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load the effective configuration from a file and the environment
///
/// `lookup` resolves environment variable names; the binary passes
/// `std::env::var(..).ok()`, tests pass a map.
pub fn load_config<P, F>(path: P, lookup: F) -> Result<CycleConfig>
where
    P: AsRef<Path>,
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let file = match read_config_file(path) {
        Ok(layer) => layer,
        Err(e) => {
            tracing::warn!(
                "Error loading config from {:?}, using environment only: {}",
                path,
                e
            );
            ConfigLayer::default()
        }
    };
    let env = ConfigLayer::from_env(lookup)?;
    merge_config(file, env)
}

/// Read the file layer. A missing file yields an empty layer.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigLayer> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("Config file {:?} not found, using environment only", path);
        return Ok(ConfigLayer::default());
    }

    let contents = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let layer = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };
    Ok(layer)
}

impl ConfigLayer {
    /// Build the environment layer
    ///
    /// Each field is read from `CONFLUENCE_BACKUP_<NAME>` with the older
    /// `JIRA_<NAME>` spelling as a fallback. Empty values count as unset.
    pub fn from_env<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |current: &str, legacy: Option<&str>| -> Option<(String, String)> {
            let found = lookup(current)
                .filter(|v| !v.is_empty())
                .map(|v| (current.to_string(), v));
            found.or_else(|| {
                legacy.and_then(|name| {
                    lookup(name)
                        .filter(|v| !v.is_empty())
                        .map(|v| (name.to_string(), v))
                })
            })
        };
        let text = |current: &str, legacy: Option<&str>| var(current, legacy).map(|(_, v)| v);

        Ok(Self {
            base_url: text("CONFLUENCE_BACKUP_BASE_URL", Some("JIRA_BASE_URL")),
            space_key: text("CONFLUENCE_BACKUP_SPACE_KEY", Some("JIRA_SPACE_KEY")),
            token: text("CONFLUENCE_BACKUP_TOKEN", Some("JIRA_TOKEN")),
            backup_dir: text("CONFLUENCE_BACKUP_BACKUP_DIR", Some("JIRA_BACKUP_DIR")).map(Into::into),
            timeout_minutes: parse_env(var("CONFLUENCE_BACKUP_TIMEOUT_MINUTES", Some("JIRA_TIMEOUT")))?,
            retention_days: parse_env(var(
                "CONFLUENCE_BACKUP_RETENTION_DAYS",
                Some("JIRA_RENTENTION_DAYS"),
            ))?,
            tls_mode: parse_env(var("CONFLUENCE_BACKUP_TLS_MODE", None))?,
            ca_cert: text("CONFLUENCE_BACKUP_CA_CERT", None).map(Into::into),
            poll_interval_seconds: parse_env(var("CONFLUENCE_BACKUP_POLL_INTERVAL_SECONDS", None))?,
            poll_max_attempts: parse_env(var("CONFLUENCE_BACKUP_POLL_MAX_ATTEMPTS", None))?,
            poll_deadline_minutes: parse_env(var("CONFLUENCE_BACKUP_POLL_DEADLINE_MINUTES", None))?,
            verify_archive: parse_bool(var("CONFLUENCE_BACKUP_VERIFY_ARCHIVE", None))?,
            resume_pending_job: parse_bool(var("CONFLUENCE_BACKUP_RESUME_PENDING_JOB", None))?,
            delete_after_upload: parse_bool(var("CONFLUENCE_BACKUP_DELETE_AFTER_UPLOAD", None))?,
            s3_bucket: text("CONFLUENCE_BACKUP_S3_BUCKET", Some("JIRA_S3_BUCKET")),
            s3_key_prefix: text("CONFLUENCE_BACKUP_S3_KEY_PREFIX", Some("JIRA_S3_KEY_PREFIX")),
            s3_region: text("CONFLUENCE_BACKUP_S3_REGION", Some("JIRA_S3_REGION")),
            s3_access_key: text("CONFLUENCE_BACKUP_S3_ACCESS_KEY", Some("JIRA_S3_ACCESS_KEY")),
            s3_secret_key: text("CONFLUENCE_BACKUP_S3_SECRET_KEY", Some("JIRA_S3_SECRET_KEY")),
            s3_endpoint: text("CONFLUENCE_BACKUP_S3_ENDPOINT", None),
            log_directory: text("CONFLUENCE_BACKUP_LOG_DIRECTORY", None).map(Into::into),
            log_level: text("CONFLUENCE_BACKUP_LOG_LEVEL", None),
            log_max_files: parse_env(var("CONFLUENCE_BACKUP_LOG_MAX_FILES", None))?,
        })
    }

    /// Field-by-field overlay: values in `over` win
    pub fn overlay(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            base_url: over.base_url.or(self.base_url),
            space_key: over.space_key.or(self.space_key),
            token: over.token.or(self.token),
            backup_dir: over.backup_dir.or(self.backup_dir),
            timeout_minutes: over.timeout_minutes.or(self.timeout_minutes),
            retention_days: over.retention_days.or(self.retention_days),
            tls_mode: over.tls_mode.or(self.tls_mode),
            ca_cert: over.ca_cert.or(self.ca_cert),
            poll_interval_seconds: over.poll_interval_seconds.or(self.poll_interval_seconds),
            poll_max_attempts: over.poll_max_attempts.or(self.poll_max_attempts),
            poll_deadline_minutes: over.poll_deadline_minutes.or(self.poll_deadline_minutes),
            verify_archive: over.verify_archive.or(self.verify_archive),
            resume_pending_job: over.resume_pending_job.or(self.resume_pending_job),
            delete_after_upload: over.delete_after_upload.or(self.delete_after_upload),
            s3_bucket: over.s3_bucket.or(self.s3_bucket),
            s3_key_prefix: over.s3_key_prefix.or(self.s3_key_prefix),
            s3_region: over.s3_region.or(self.s3_region),
            s3_access_key: over.s3_access_key.or(self.s3_access_key),
            s3_secret_key: over.s3_secret_key.or(self.s3_secret_key),
            s3_endpoint: over.s3_endpoint.or(self.s3_endpoint),
            log_directory: over.log_directory.or(self.log_directory),
            log_level: over.log_level.or(self.log_level),
            log_max_files: over.log_max_files.or(self.log_max_files),
        }
    }
}

fn parse_env<T>(entry: Option<(String, String)>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match entry {
        None => Ok(None),
        Some((name, raw)) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: name,
                reason: format!("'{}': {}", raw, e),
            }),
    }
}

fn parse_bool(entry: Option<(String, String)>) -> Result<Option<bool>> {
    match entry {
        None => Ok(None),
        Some((name, raw)) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                field: name,
                reason: format!("'{}' is not a boolean", raw),
            }),
        },
    }
}

/// Merge the file and environment layers into the effective configuration
///
/// Environment values override file values; defaults apply only when both
/// layers leave a field unset.
pub fn merge_config(file: ConfigLayer, env: ConfigLayer) -> Result<CycleConfig> {
    let merged = file.overlay(env);

    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let base_url = non_empty(merged.base_url);
    let space_key = non_empty(merged.space_key);
    let token = non_empty(merged.token);

    let mut missing = Vec::new();
    if base_url.is_none() {
        missing.push("base_url");
    }
    if space_key.is_none() {
        missing.push("space_key");
    }
    if token.is_none() {
        missing.push("token");
    }
    let (Some(base_url), Some(space_key), Some(token)) = (base_url, space_key, token) else {
        return Err(ConfigError::MissingFields(missing));
    };

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::InvalidValue {
            field: "base_url".to_string(),
            reason: format!("'{}' is not an http(s) URL", base_url),
        });
    }

    let timeout_minutes = match merged.timeout_minutes {
        Some(0) | None => DEFAULT_TIMEOUT_MINUTES,
        Some(minutes) => minutes,
    };

    let request_timeout = minutes("timeout_minutes", timeout_minutes)?;

    let tls = match merged.tls_mode.unwrap_or_default() {
        TlsMode::Verify => TlsPolicy::Verify,
        TlsMode::Insecure => TlsPolicy::Insecure,
        TlsMode::Pinned => match merged.ca_cert {
            Some(path) => TlsPolicy::Pinned(super::expand_tilde(&path)),
            None => {
                return Err(ConfigError::InvalidValue {
                    field: "ca_cert".to_string(),
                    reason: "tls_mode = \"pinned\" requires a CA certificate path".to_string(),
                })
            }
        },
    };

    let poll = PollSettings {
        interval: Duration::from_secs(
            merged
                .poll_interval_seconds
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
        ),
        max_attempts: merged.poll_max_attempts.filter(|n| *n > 0),
        deadline: merged
            .poll_deadline_minutes
            .filter(|m| *m > 0)
            .map(|m| minutes("poll_deadline_minutes", m))
            .transpose()?,
    };

    let s3 = non_empty(merged.s3_bucket).map(|bucket| S3Settings {
        bucket,
        key_prefix: merged.s3_key_prefix.unwrap_or_default(),
        region: non_empty(merged.s3_region),
        access_key: non_empty(merged.s3_access_key).map(Secret::new),
        secret_key: non_empty(merged.s3_secret_key).map(Secret::new),
        endpoint: non_empty(merged.s3_endpoint),
    });

    let backup_dir = merged
        .backup_dir
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| super::expand_tilde(&p))
        .unwrap_or_else(|| ".".into());

    Ok(CycleConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        space_key,
        token: Secret::new(token),
        backup_dir,
        request_timeout,
        retention_days: merged.retention_days.unwrap_or(0),
        tls,
        poll,
        verify_archive: merged.verify_archive.unwrap_or(false),
        resume_pending_job: merged.resume_pending_job.unwrap_or(false),
        delete_after_upload: merged.delete_after_upload.unwrap_or(false),
        s3,
        logging: LogSettings {
            directory: merged.log_directory.map(|p| super::expand_tilde(&p)),
            level: merged
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            max_files: merged.log_max_files.unwrap_or(DEFAULT_LOG_MAX_FILES),
        },
    })
}

fn minutes(field: &str, value: u64) -> Result<Duration> {
    value
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} minutes is out of range", value),
        })
}
