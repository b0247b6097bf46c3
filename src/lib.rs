//! Confluence Backup Library
//!
//! Triggers a remote export of one Confluence space, waits for the job,
//! downloads the archive, sweeps old local archives and hands the new one
//! to an archive sink.

pub mod config;
pub mod error;
pub mod managers;
pub mod sinks;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, merge_config, CycleConfig};
pub use error::BackupError;
pub use managers::cycle::{BackupCycle, CycleError, CycleReport, CycleStage};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use sinks::{build_sink, ArchiveSink, NoopSink, SinkReceipt};
