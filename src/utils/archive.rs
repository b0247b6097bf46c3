//! Archive download and verification

use super::confluence::JobId;
use super::confluence_ops::ConfluenceOperations;
use crate::error::{BackupError, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A downloaded archive on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Reduce a server-provided name to a bare file name inside the backup dir
pub fn local_file_name(remote_name: &str) -> Result<String> {
    Path::new(remote_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            BackupError::ProtocolError(format!("unusable archive file name '{}'", remote_name))
        })
}

/// Stream the archive of a finished job into `backup_dir`
///
/// The request is made before the local file is created. A stream that breaks
/// mid-transfer leaves the truncated file in place; its path is reported in
/// the returned `DownloadFailed` error.
pub fn fetch_archive(
    ops: &dyn ConfluenceOperations,
    job_id: JobId,
    remote_name: &str,
    backup_dir: &Path,
) -> Result<FetchedArchive> {
    let file_name = local_file_name(remote_name)?;
    let mut stream = ops.open_download(job_id, remote_name)?;

    let path = backup_dir.join(&file_name);
    debug!("Writing archive to {:?}", path);
    let mut file = File::create(&path).map_err(|source| BackupError::LocalWriteFailed {
        path: path.clone(),
        source,
    })?;

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes: u64 = 0;
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(BackupError::DownloadFailed {
                    file_name,
                    partial: Some(path),
                    reason: format!("stream broke after {} bytes: {}", bytes, e),
                })
            }
        };
        file.write_all(&buf[..n])
            .map_err(|source| BackupError::LocalWriteFailed {
                path: path.clone(),
                source,
            })?;
        bytes += n as u64;
    }

    file.flush().map_err(|source| BackupError::LocalWriteFailed {
        path: path.clone(),
        source,
    })?;

    info!("Downloaded {} bytes to {:?}", bytes, path);
    Ok(FetchedArchive { path, bytes })
}

/// Open the file as a zip archive and return its entry count
pub fn verify_archive(path: &Path) -> Result<usize> {
    let invalid = |reason: String| BackupError::ArchiveInvalid {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;

    // Touch every entry header so a truncated central directory is caught
    for i in 0..archive.len() {
        archive.by_index(i).map_err(|e| invalid(e.to_string()))?;
    }

    debug!("Archive {:?} contains {} entries", path, archive.len());
    Ok(archive.len())
}
