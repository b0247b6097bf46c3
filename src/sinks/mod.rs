//! Archive sinks
//!
//! A sink receives the local archive at the end of a successful cycle.
//! [`NoopSink`] keeps the archive local only; [`s3::S3Sink`] copies it to
//! an S3 bucket.

pub mod s3;

use crate::config::CycleConfig;
use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Where a sink put the archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Remote location of the copy; `None` when nothing left the machine
    pub location: Option<String>,
}

/// Destination for a completed local archive
pub trait ArchiveSink {
    /// Store the archive at `archive`
    fn store(&self, archive: &Path) -> Result<SinkReceipt>;

    /// Get sink name (for logging)
    fn name(&self) -> &'static str;
}

/// Sink that leaves the archive where the fetcher put it
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ArchiveSink for NoopSink {
    fn store(&self, archive: &Path) -> Result<SinkReceipt> {
        info!("No remote storage configured, keeping {:?} locally", archive);
        Ok(SinkReceipt::default())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Pick the sink for this configuration
pub fn build_sink(config: &CycleConfig) -> anyhow::Result<Box<dyn ArchiveSink>> {
    match &config.s3 {
        Some(settings) => Ok(Box::new(s3::S3Sink::new(settings)?)),
        None => Ok(Box::new(NoopSink)),
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use crate::error::BackupError;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Sink that records every archive it is given
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub stored: Arc<Mutex<Vec<PathBuf>>>,
        location_prefix: Option<String>,
        failure: Option<String>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Report a remote location `<prefix>/<file name>` for stored archives
        pub fn with_location(mut self, prefix: &str) -> Self {
            self.location_prefix = Some(prefix.to_string());
            self
        }

        /// Fail every store call with `reason`
        pub fn failing(mut self, reason: &str) -> Self {
            self.failure = Some(reason.to_string());
            self
        }

        pub fn stored(&self) -> Vec<PathBuf> {
            self.stored.lock().unwrap().clone()
        }
    }

    impl ArchiveSink for RecordingSink {
        fn store(&self, archive: &Path) -> Result<SinkReceipt> {
            self.stored.lock().unwrap().push(archive.to_path_buf());
            if let Some(reason) = &self.failure {
                return Err(BackupError::UploadFailed {
                    sink: self.name().to_string(),
                    path: archive.to_path_buf(),
                    reason: reason.clone(),
                });
            }
            let location = self.location_prefix.as_ref().map(|prefix| {
                let name = archive
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}/{}", prefix, name)
            });
            Ok(SinkReceipt { location })
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }
}
