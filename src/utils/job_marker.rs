//! Pending job marker
//!
//! Records the id of a triggered backup job in the backup directory so a
//! cycle that dies while polling can pick the same job up on the next run
//! instead of starting a second export.

use super::confluence::JobId;
use crate::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJob {
    pub job_id: JobId,
    pub space_key: String,
    pub started_at: DateTime<Utc>,
}

/// Marker file location for a space
pub fn marker_path(backup_dir: &Path, space_key: &str) -> PathBuf {
    backup_dir.join(format!(".confluence-backup-{}.job", space_key))
}

/// Read the marker for `space_key`, if one exists
pub fn load(backup_dir: &Path, space_key: &str) -> Result<Option<PendingJob>> {
    let path = marker_path(backup_dir, space_key);
    if !path.exists() {
        return Ok(None);
    }

    let marker_error = |reason: String| BackupError::JobMarker {
        path: path.clone(),
        reason,
    };

    let contents = fs::read_to_string(&path).map_err(|e| marker_error(e.to_string()))?;
    let pending: PendingJob =
        serde_json::from_str(&contents).map_err(|e| marker_error(e.to_string()))?;

    if pending.space_key != space_key {
        return Err(marker_error(format!(
            "marker belongs to space '{}'",
            pending.space_key
        )));
    }

    Ok(Some(pending))
}

/// Persist the marker before polling starts
pub fn save(backup_dir: &Path, pending: &PendingJob) -> Result<()> {
    let path = marker_path(backup_dir, &pending.space_key);
    let contents = serde_json::to_string_pretty(pending).map_err(|e| BackupError::JobMarker {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    fs::write(&path, contents).map_err(|e| BackupError::JobMarker {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    debug!("Recorded pending job {} in {:?}", pending.job_id, path);
    Ok(())
}

/// Remove the marker (best effort)
pub fn clear(backup_dir: &Path, space_key: &str) {
    let path = marker_path(backup_dir, space_key);
    match fs::remove_file(&path) {
        Ok(()) => debug!("Removed pending job marker {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove pending job marker {:?}: {}", path, e),
    }
}
