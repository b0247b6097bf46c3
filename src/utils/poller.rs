//! Job status polling
//!
//! Polls a backup job until the server reports a terminal state. How long
//! to wait between checks, and whether to give up at all, is decided by the
//! [`PollPolicy`] handed in by the caller.

use super::confluence::{JobId, JobState};
use super::confluence_ops::ConfluenceOperations;
use crate::config::PollSettings;
use crate::error::{BackupError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Upper bound for a single sleep slice so cancellation is noticed quickly
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Shared flag that stops a running poll loop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wait/give-up rules for the poll loop
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Total status checks allowed; `None` polls until a terminal state
    pub max_attempts: Option<u32>,
    /// Wall-clock budget for the whole loop
    pub deadline: Option<Duration>,
    pub cancel: CancelToken,
}

impl PollPolicy {
    /// Poll forever at a fixed interval
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            deadline: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn from_settings(settings: &PollSettings) -> Self {
        Self {
            interval: settings.interval,
            max_attempts: settings.max_attempts,
            deadline: settings.deadline,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline given in minutes; values past `u64::MAX` seconds saturate
    pub fn with_deadline_minutes(self, minutes: u64) -> Self {
        self.with_deadline(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A job that reached FINISHED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job_id: JobId,
    /// Server-side archive name
    pub file_name: String,
    /// Number of status checks made, including the final one
    pub attempts: u32,
}

/// Block until `job_id` is FINISHED or FAILED
///
/// Any error from a status check ends the loop immediately; there is no
/// retry on transient failures.
pub fn wait_for_job(
    ops: &dyn ConfluenceOperations,
    job_id: JobId,
    policy: &PollPolicy,
) -> Result<CompletedJob> {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        if policy.cancel.is_cancelled() {
            return Err(BackupError::PollCancelled { job_id });
        }

        attempts += 1;
        let status = ops.job_status(job_id)?;
        info!("⌛ Job {} status: {}", job_id, status.state);

        match status.state {
            JobState::Finished => {
                let file_name = status.file_name.ok_or_else(|| {
                    BackupError::ProtocolError(format!(
                        "job {} finished without a file name",
                        job_id
                    ))
                })?;
                return Ok(CompletedJob {
                    job_id,
                    file_name,
                    attempts,
                });
            }
            JobState::Failed => return Err(BackupError::JobFailed { job_id }),
            _ => {}
        }

        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                return Err(BackupError::PollExhausted { job_id, attempts });
            }
        }

        if let Some(deadline) = policy.deadline {
            if started.elapsed().saturating_add(policy.interval) > deadline {
                return Err(BackupError::PollTimedOut {
                    job_id,
                    waited_secs: started.elapsed().as_secs(),
                });
            }
        }

        info!("🔄 Backup in progress, next check in {:?}", policy.interval);
        sleep_unless_cancelled(policy.interval, &policy.cancel);
    }
}

fn sleep_unless_cancelled(duration: Duration, cancel: &CancelToken) {
    // An interval past the clock's range waits until cancelled
    let until = Instant::now().checked_add(duration);
    loop {
        if cancel.is_cancelled() {
            debug!("Poll wait interrupted by cancellation");
            return;
        }
        let slice = match until {
            Some(until) => {
                let now = Instant::now();
                if now >= until {
                    return;
                }
                (until - now).min(SLEEP_SLICE)
            }
            None => SLEEP_SLICE,
        };
        std::thread::sleep(slice);
    }
}
