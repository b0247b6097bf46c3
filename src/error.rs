//! Error taxonomy for a backup cycle
//!
//! Every stage of the cycle reports one of these variants so the operator can
//! tell from the message alone which remote call or local operation failed.

use std::path::PathBuf;

use crate::utils::confluence::JobId;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Backup request could not be sent: {0}")]
    RequestFailed(String),

    #[error("Backup service rejected the request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("Unexpected response from backup service: {0}")]
    ProtocolError(String),

    #[error("Backup job {job_id} failed on the server")]
    JobFailed { job_id: JobId },

    #[error("Polling backup job {job_id} failed: {reason}")]
    PollFailed { job_id: JobId, reason: String },

    #[error("Backup job {job_id} still not finished after {attempts} status checks")]
    PollExhausted { job_id: JobId, attempts: u32 },

    #[error("Backup job {job_id} did not finish within {waited_secs}s")]
    PollTimedOut { job_id: JobId, waited_secs: u64 },

    #[error("Polling of backup job {job_id} was cancelled")]
    PollCancelled { job_id: JobId },

    #[error("Download of {file_name} failed: {reason}")]
    DownloadFailed {
        file_name: String,
        /// Truncated local file left behind when the stream broke mid-transfer
        partial: Option<PathBuf>,
        reason: String,
    },

    #[error("Failed to write archive {path:?}: {source}")]
    LocalWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloaded archive {path:?} is not a readable zip: {reason}")]
    ArchiveInvalid { path: PathBuf, reason: String },

    #[error("Cannot read backup directory {dir:?}: {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of {path:?} to {sink} failed: {reason}")]
    UploadFailed {
        sink: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Pending job marker {path:?} is unusable: {reason}")]
    JobMarker { path: PathBuf, reason: String },
}

impl BackupError {
    /// Local file left behind by a failed download, if any
    pub fn partial_download(&self) -> Option<&PathBuf> {
        match self {
            BackupError::DownloadFailed { partial, .. } => partial.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
