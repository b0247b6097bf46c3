//! Backup cycle - orchestrates one space export from trigger to upload

use crate::config::CycleConfig;
use crate::error::BackupError;
use crate::sinks::{ArchiveSink, SinkReceipt};
use crate::utils::archive::{self, FetchedArchive};
use crate::utils::confluence::JobId;
use crate::utils::confluence_ops::ConfluenceOperations;
use crate::utils::job_marker::{self, PendingJob};
use crate::utils::poller::{self, PollPolicy};
use crate::utils::retention::{self, SweepReport};
use chrono::Utc;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Progress of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Start,
    Requested,
    Polling,
    Downloaded,
    Cleaned,
    Done,
    Failed,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::Start => "start",
            CycleStage::Requested => "requested",
            CycleStage::Polling => "polling",
            CycleStage::Downloaded => "downloaded",
            CycleStage::Cleaned => "cleaned",
            CycleStage::Done => "done",
            CycleStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A cycle that ended in the failed state
#[derive(Debug, thiserror::Error)]
#[error("Backup cycle failed after reaching stage '{stage}': {source}")]
pub struct CycleError {
    /// Last stage completed before the failure
    pub stage: CycleStage,
    #[source]
    pub source: BackupError,
}

/// Summary of a successful cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub job_id: JobId,
    /// Job was picked up from a pending-job marker instead of triggered
    pub resumed: bool,
    pub archive: FetchedArchive,
    pub archive_entries: Option<usize>,
    /// `None` when the sweep itself failed
    pub sweep: Option<SweepReport>,
    pub upload: SinkReceipt,
    /// Local archive was removed after an authoritative upload
    pub local_removed: bool,
    pub stage: CycleStage,
}

pub struct BackupCycle {
    config: CycleConfig,
    ops: Box<dyn ConfluenceOperations>,
    sink: Box<dyn ArchiveSink>,
    policy: PollPolicy,
}

impl BackupCycle {
    /// Create a cycle using the poll policy from the configuration
    pub fn new(
        config: CycleConfig,
        ops: Box<dyn ConfluenceOperations>,
        sink: Box<dyn ArchiveSink>,
    ) -> Self {
        let policy = PollPolicy::from_settings(&config.poll);
        Self {
            config,
            ops,
            sink,
            policy,
        }
    }

    /// Replace the poll policy (tests use a zero interval)
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    fn fail(&self, stage: CycleStage, source: BackupError) -> CycleError {
        error!(
            "✗ Backup of space '{}' failed after stage '{}': {}",
            self.config.space_key, stage, source
        );
        if let Some(partial) = source.partial_download() {
            warn!("Truncated archive left at {:?}", partial);
        }
        CycleError { stage, source }
    }

    fn enter(&self, stage: CycleStage) -> CycleStage {
        info!(stage = %stage, space = %self.config.space_key, "Backup cycle reached stage '{}'", stage);
        stage
    }

    /// Run one full cycle: trigger, poll, download, clean up, upload
    pub fn run(&self) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let mut stage = self.enter(CycleStage::Start);

        let (job_id, resumed) = self.trigger_or_resume().map_err(|e| self.fail(stage, e))?;
        self.enter(CycleStage::Requested);
        info!("⏩ Backup job {}: {}", if resumed { "resumed" } else { "started" }, job_id);

        if self.config.resume_pending_job && !resumed {
            let pending = PendingJob {
                job_id,
                space_key: self.config.space_key.clone(),
                started_at: Utc::now(),
            };
            if let Err(e) = job_marker::save(&self.config.backup_dir, &pending) {
                warn!("Could not record pending job, a restart will trigger a new export: {}", e);
            }
        }

        stage = self.enter(CycleStage::Polling);
        let completed = match poller::wait_for_job(self.ops.as_ref(), job_id, &self.policy) {
            Ok(completed) => completed,
            Err(e) => {
                if matches!(e, BackupError::JobFailed { .. }) {
                    job_marker::clear(&self.config.backup_dir, &self.config.space_key);
                }
                return Err(self.fail(stage, e));
            }
        };

        info!("⬇️ Downloading backup file {}", completed.file_name);
        let fetched = archive::fetch_archive(
            self.ops.as_ref(),
            job_id,
            &completed.file_name,
            &self.config.backup_dir,
        )
        .map_err(|e| self.fail(stage, e))?;

        let archive_entries = if self.config.verify_archive {
            let entries = archive::verify_archive(&fetched.path).map_err(|e| self.fail(stage, e))?;
            info!("Archive verified: {} entries", entries);
            Some(entries)
        } else {
            None
        };

        if self.config.resume_pending_job {
            job_marker::clear(&self.config.backup_dir, &self.config.space_key);
        }
        self.enter(CycleStage::Downloaded);

        info!("🧹 Cleanup old backups");
        let sweep = match retention::sweep_old_archives(
            &self.config.backup_dir,
            &self.config.space_key,
            self.config.retention_days,
            Utc::now(),
        ) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Cleanup warning: {}", e);
                None
            }
        };
        stage = self.enter(CycleStage::Cleaned);

        info!("Storing archive via {} sink", self.sink.name());
        let upload = self
            .sink
            .store(&fetched.path)
            .map_err(|e| self.fail(stage, e))?;

        let local_removed = self.remove_local_copy(&fetched.path, &upload);

        stage = self.enter(CycleStage::Done);
        info!(
            "✓ Backup complete: {:?} ({} bytes) in {:.2}s",
            fetched.path,
            fetched.bytes,
            started.elapsed().as_secs_f64()
        );

        Ok(CycleReport {
            job_id,
            resumed,
            archive: fetched,
            archive_entries,
            sweep,
            upload,
            local_removed,
            stage,
        })
    }

    fn trigger_or_resume(&self) -> Result<(JobId, bool), BackupError> {
        if self.config.resume_pending_job {
            match job_marker::load(&self.config.backup_dir, &self.config.space_key) {
                Ok(Some(pending)) => {
                    info!(
                        "Resuming backup job {} started at {}",
                        pending.job_id, pending.started_at
                    );
                    return Ok((pending.job_id, true));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Ignoring pending job marker: {}", e);
                    job_marker::clear(&self.config.backup_dir, &self.config.space_key);
                }
            }
        }

        info!("▶️ Triggering backup of space '{}'", self.config.space_key);
        let job_id = self.ops.start_space_backup(&self.config.space_key)?;
        Ok((job_id, false))
    }

    /// Delete the local archive once a remote copy exists, if configured
    fn remove_local_copy(&self, path: &Path, upload: &SinkReceipt) -> bool {
        if !self.config.delete_after_upload || upload.location.is_none() {
            return false;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed local archive {:?} after upload", path);
                true
            }
            Err(e) => {
                warn!("Failed to remove local archive {:?}: {}", path, e);
                false
            }
        }
    }
}
