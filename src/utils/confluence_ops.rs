//! Confluence operations abstraction for testability
//!
//! This module provides a trait-based abstraction over the backup-restore
//! API, enabling dependency injection and mocking for tests.

use super::confluence::{ConfluenceClient, JobId, JobStatus};
use crate::error::Result;
use std::io::Read;

/// Remote calls a backup cycle needs from the Confluence server
pub trait ConfluenceOperations: Send + Sync {
    /// Start a backup of one space and return the job handle
    fn start_space_backup(&self, space_key: &str) -> Result<JobId>;

    /// Fetch the current status of a job
    fn job_status(&self, job_id: JobId) -> Result<JobStatus>;

    /// Open the archive byte stream of a finished job
    fn open_download(&self, job_id: JobId, file_name: &str) -> Result<Box<dyn Read + Send>>;
}

/// Default implementation using real HTTP calls
pub struct RealConfluenceOps {
    client: ConfluenceClient,
}

impl RealConfluenceOps {
    pub fn new(client: ConfluenceClient) -> Self {
        Self { client }
    }
}

impl ConfluenceOperations for RealConfluenceOps {
    fn start_space_backup(&self, space_key: &str) -> Result<JobId> {
        self.client.start_space_backup(space_key)
    }

    fn job_status(&self, job_id: JobId) -> Result<JobStatus> {
        self.client.job_status(job_id)
    }

    fn open_download(&self, job_id: JobId, file_name: &str) -> Result<Box<dyn Read + Send>> {
        self.client.open_download(job_id, file_name)
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use crate::error::BackupError;
    use crate::utils::confluence::JobState;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    /// Recorded operation call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ConfluenceCall {
        StartBackup { space_key: String },
        JobStatus { job_id: JobId },
        Download { job_id: JobId, file_name: String },
    }

    /// Scripted answer to a status query
    #[derive(Clone, Debug)]
    pub enum StatusReply {
        Status(JobStatus),
        TransportError(String),
    }

    /// Scripted answer to a download request
    #[derive(Clone, Debug)]
    pub enum DownloadReply {
        Bytes(Vec<u8>),
        /// Stream yields `bytes` and then fails with `reason`
        BreaksAfter { bytes: Vec<u8>, reason: String },
        Refused(String),
    }

    /// Scripted answer to the trigger call
    #[derive(Clone, Debug)]
    pub enum StartReply {
        Job(JobId),
        Rejected { status: u16, body: String },
        TransportError(String),
    }

    /// Mock Confluence server for testing
    #[derive(Clone)]
    pub struct MockConfluenceOps {
        /// Recorded operation calls
        pub calls: Arc<Mutex<Vec<ConfluenceCall>>>,
        start: Arc<Mutex<StartReply>>,
        /// Replies consumed in order; the last one repeats once the queue is drained
        statuses: Arc<Mutex<VecDeque<StatusReply>>>,
        download: Arc<Mutex<DownloadReply>>,
    }

    impl Default for MockConfluenceOps {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockConfluenceOps {
        pub fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                start: Arc::new(Mutex::new(StartReply::Job(JobId(1)))),
                statuses: Arc::new(Mutex::new(VecDeque::new())),
                download: Arc::new(Mutex::new(DownloadReply::Bytes(Vec::new()))),
            }
        }

        /// Configure the job id returned by the trigger call
        pub fn with_job_id(self, id: u64) -> Self {
            *self.start.lock().unwrap() = StartReply::Job(JobId(id));
            self
        }

        /// Configure the trigger call's reply
        pub fn with_start_reply(self, reply: StartReply) -> Self {
            *self.start.lock().unwrap() = reply;
            self
        }

        /// Queue a job status
        pub fn then_status(self, state: JobState, file_name: Option<&str>) -> Self {
            self.statuses
                .lock()
                .unwrap()
                .push_back(StatusReply::Status(JobStatus::new(state, file_name)));
            self
        }

        /// Queue a transport failure for the next status query
        pub fn then_status_error(self, reason: &str) -> Self {
            self.statuses
                .lock()
                .unwrap()
                .push_back(StatusReply::TransportError(reason.to_string()));
            self
        }

        /// Configure the download reply
        pub fn with_download(self, reply: DownloadReply) -> Self {
            *self.download.lock().unwrap() = reply;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<ConfluenceCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Job ids passed to status queries, in order
        pub fn polled_job_ids(&self) -> Vec<JobId> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    ConfluenceCall::JobStatus { job_id } => Some(*job_id),
                    _ => None,
                })
                .collect()
        }

        pub fn status_calls(&self) -> usize {
            self.polled_job_ids().len()
        }

        pub fn start_called(&self) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| matches!(c, ConfluenceCall::StartBackup { .. }))
        }

        pub fn download_called(&self) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| matches!(c, ConfluenceCall::Download { .. }))
        }

        fn record_call(&self, call: ConfluenceCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ConfluenceOperations for MockConfluenceOps {
        fn start_space_backup(&self, space_key: &str) -> Result<JobId> {
            self.record_call(ConfluenceCall::StartBackup {
                space_key: space_key.to_string(),
            });
            match self.start.lock().unwrap().clone() {
                StartReply::Job(id) => Ok(id),
                StartReply::Rejected { status, body } => {
                    Err(BackupError::RemoteRejected { status, body })
                }
                StartReply::TransportError(reason) => Err(BackupError::RequestFailed(reason)),
            }
        }

        fn job_status(&self, job_id: JobId) -> Result<JobStatus> {
            self.record_call(ConfluenceCall::JobStatus { job_id });
            let reply = {
                let mut queue = self.statuses.lock().unwrap();
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            };
            match reply {
                Some(StatusReply::Status(status)) => Ok(status),
                Some(StatusReply::TransportError(reason)) => {
                    Err(BackupError::PollFailed { job_id, reason })
                }
                None => Ok(JobStatus::new(JobState::Pending, None)),
            }
        }

        fn open_download(&self, job_id: JobId, file_name: &str) -> Result<Box<dyn Read + Send>> {
            self.record_call(ConfluenceCall::Download {
                job_id,
                file_name: file_name.to_string(),
            });
            match self.download.lock().unwrap().clone() {
                DownloadReply::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
                DownloadReply::BreaksAfter { bytes, reason } => Ok(Box::new(BrokenStream {
                    data: Cursor::new(bytes),
                    reason,
                })),
                DownloadReply::Refused(reason) => Err(BackupError::DownloadFailed {
                    file_name: file_name.to_string(),
                    partial: None,
                    reason,
                }),
            }
        }
    }

    /// Reader that fails once its buffered bytes are used up
    struct BrokenStream {
        data: Cursor<Vec<u8>>,
        reason: String,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    self.reason.clone(),
                ));
            }
            Ok(n)
        }
    }
}
