//! Confluence backup-restore REST client

use crate::config::{CycleConfig, TlsPolicy};
use crate::error::{BackupError, Result};
use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use tracing::{debug, warn};

/// Handle of a backup job on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-reported job state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Finished,
    Failed,
    /// Any state string this client does not know; polled like a running job
    Other(String),
}

impl JobState {
    pub fn from_remote(state: &str) -> Self {
        match state {
            "PENDING" => JobState::Pending,
            "RUNNING" => JobState::Running,
            "FINISHED" => JobState::Finished,
            "FAILED" => JobState::Failed,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => f.write_str("PENDING"),
            JobState::Running => f.write_str("RUNNING"),
            JobState::Finished => f.write_str("FINISHED"),
            JobState::Failed => f.write_str("FAILED"),
            JobState::Other(s) => f.write_str(s),
        }
    }
}

/// One status snapshot of a backup job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub file_name: Option<String>,
    pub file_exists: bool,
}

impl JobStatus {
    pub fn new(state: JobState, file_name: Option<&str>) -> Self {
        Self {
            state,
            file_name: file_name.map(String::from),
            file_exists: file_name.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpaceBackupRequest<'a> {
    space_keys: [&'a str; 1],
    keep_permanently: bool,
    file_name_prefix: &'a str,
}

#[derive(Debug, Deserialize)]
struct SpaceBackupResponse {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusResponse {
    job_state: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_exists: bool,
}

/// Parse the body of a successful "create backup" call
pub fn parse_job_id(body: &str) -> Result<JobId> {
    serde_json::from_str::<SpaceBackupResponse>(body)
        .map(|resp| JobId(resp.id))
        .map_err(|e| BackupError::ProtocolError(format!("invalid backup response '{}': {}", body, e)))
}

/// Parse the body of a job status call
pub fn parse_job_status(body: &str) -> Result<JobStatus> {
    let resp: JobStatusResponse = serde_json::from_str(body).map_err(|e| {
        BackupError::ProtocolError(format!("invalid job status response '{}': {}", body, e))
    })?;

    Ok(JobStatus {
        state: JobState::from_remote(&resp.job_state),
        file_name: resp.file_name.filter(|n| !n.is_empty()),
        file_exists: resp.file_exists,
    })
}

/// Build the HTTP client for one cycle, applying the configured trust policy
pub fn build_client(config: &CycleConfig) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("confluence-backup/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout)
        .http1_only();

    match &config.tls {
        TlsPolicy::Verify => {}
        TlsPolicy::Pinned(ca_path) => {
            let pem = std::fs::read(ca_path)
                .with_context(|| format!("Failed to read CA certificate: {:?}", ca_path))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .with_context(|| format!("Invalid CA certificate: {:?}", ca_path))?;
            builder = builder.tls_built_in_root_certs(false).add_root_certificate(cert);
        }
        TlsPolicy::Insecure => {
            warn!("TLS certificate validation is disabled (tls_mode = insecure)");
            builder = builder.danger_accept_invalid_certs(true);
        }
    }

    builder.build().context("Failed to create HTTP client")
}

/// Connection to the backup-restore API of one Confluence instance
pub struct ConfluenceClient {
    client: Client,
    base_url: String,
    auth_header: String,
}

impl ConfluenceClient {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("ksso-token {}", token),
        }
    }

    pub fn from_config(config: &CycleConfig) -> anyhow::Result<Self> {
        let client = build_client(config)?;
        Ok(Self::new(client, &config.base_url, config.token.expose()))
    }

    pub fn backup_url(&self) -> String {
        format!("{}/rest/api/backup-restore/backup/space", self.base_url)
    }

    pub fn job_url(&self, job_id: JobId) -> String {
        format!("{}/rest/api/backup-restore/jobs/{}", self.base_url, job_id)
    }

    pub fn download_url(&self, job_id: JobId) -> String {
        format!("{}/download", self.job_url(job_id))
    }

    /// Ask the server to start a backup of `space_key`
    pub fn start_space_backup(&self, space_key: &str) -> Result<JobId> {
        if space_key.is_empty() {
            return Err(BackupError::RequestFailed("space key is empty".to_string()));
        }

        let payload = SpaceBackupRequest {
            space_keys: [space_key],
            keep_permanently: false,
            file_name_prefix: "",
        };

        debug!("POST {}", self.backup_url());
        let response = self
            .client
            .post(self.backup_url())
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .map_err(|e| BackupError::RequestFailed(e.to_string()))?;

        let body = read_success_body(response)?;
        parse_job_id(&body)
    }

    /// Fetch the current status of a job
    pub fn job_status(&self, job_id: JobId) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.job_url(job_id))
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .map_err(|e| BackupError::PollFailed {
                job_id,
                reason: e.to_string(),
            })?;

        let body = read_success_body(response)?;
        parse_job_status(&body)
    }

    /// Open the archive stream of a finished job
    pub fn open_download(&self, job_id: JobId, file_name: &str) -> Result<Box<dyn Read + Send>> {
        let download_failed = |reason: String| BackupError::DownloadFailed {
            file_name: file_name.to_string(),
            partial: None,
            reason,
        };

        let response = self
            .client
            .get(self.download_url(job_id))
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_DISPOSITION, format!("attachment; filename={}", file_name))
            .send()
            .map_err(|e| download_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(download_failed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        Ok(Box::new(response))
    }
}

/// Return the body of a 2xx response, or `RemoteRejected` with status and body
fn read_success_body(response: Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackupError::RemoteRejected {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }

    response
        .text()
        .map_err(|e| BackupError::ProtocolError(format!("unreadable response body: {}", e)))
}
