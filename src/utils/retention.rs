//! Local archive retention
//!
//! Deletes space exports older than the retention window. Only files named
//! `Confluence-space-export-<space>-*.zip` are ever considered.

use crate::error::{BackupError, Result};
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ARCHIVE_PREFIX: &str = "Confluence-space-export-";
const ARCHIVE_SUFFIX: &str = ".zip";

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Archives of this space that were looked at
    pub examined: usize,
    pub deleted: Vec<PathBuf>,
    /// Candidates that could not be stat'ed or removed
    pub failed: Vec<PathBuf>,
    /// True when retention is disabled and nothing was scanned
    pub disabled: bool,
}

/// Whether `file_name` is an export archive of `space_key`
pub fn is_space_archive(file_name: &str, space_key: &str) -> bool {
    let prefix = format!("{}{}-", ARCHIVE_PREFIX, space_key);
    file_name.starts_with(&prefix) && file_name.ends_with(ARCHIVE_SUFFIX)
}

/// Remove archives of `space_key` in `dir` last modified before `now - retention_days`
///
/// `retention_days <= 0` disables the sweep. A directory that cannot be read
/// fails the sweep; a single file that cannot be stat'ed or removed is logged
/// and skipped.
pub fn sweep_old_archives(
    dir: &Path,
    space_key: &str,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    if retention_days <= 0 {
        info!("Retention disabled, skipping cleanup");
        return Ok(SweepReport {
            disabled: true,
            ..Default::default()
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| BackupError::CleanupFailed {
        dir: dir.to_path_buf(),
        source,
    })?;

    // A window past chrono's range predates every file
    let Some(cutoff) = Duration::try_days(retention_days).and_then(|d| now.checked_sub_signed(d))
    else {
        info!(
            "Retention window of {} days predates any file, nothing to delete",
            retention_days
        );
        return Ok(SweepReport::default());
    };
    debug!("Deleting {} archives modified before {}", space_key, cutoff);

    let mut report = SweepReport::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable directory entry in {:?}: {}", dir, e);
                continue;
            }
        };

        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !is_space_archive(&name, space_key) {
            continue;
        }

        report.examined += 1;
        let path = entry.path();

        let modified = match fs::metadata(&path).and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => DateTime::<Utc>::from(modified),
            Ok(None) => {
                debug!("Skipping {} (not a regular file)", name);
                continue;
            }
            Err(e) => {
                warn!("Skipping file (stat error): {}: {}", name, e);
                report.failed.push(path);
                continue;
            }
        };

        if modified < cutoff {
            info!("Deleting old backup: {}", name);
            match fs::remove_file(&path) {
                Ok(()) => report.deleted.push(path),
                Err(e) => {
                    warn!("Failed to delete {}: {}", name, e);
                    report.failed.push(path);
                }
            }
        }
    }

    info!(
        "Cleanup examined {} archive(s), deleted {}, {} error(s)",
        report.examined,
        report.deleted.len(),
        report.failed.len()
    );

    Ok(report)
}
