//! Test utilities for confluence-backup
//!
//! This crate provides shared test utilities, fixtures and helper
//! functions for testing the confluence-backup application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockConfluenceOps, RecordingSink};
//!
//! #[test]
//! fn my_test() {
//!     let (config, temp_dir) = ConfigBuilder::new().with_retention_days(7).persist();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use confluence_backup::config::{ConfigLayer, CycleConfig, TlsMode, TlsPolicy};
pub use confluence_backup::utils::confluence::{JobId, JobState, JobStatus};

// Re-export mock implementations from the main crate
pub use confluence_backup::sinks::mock::RecordingSink;
pub use confluence_backup::sinks::ArchiveSink;
pub use confluence_backup::utils::confluence_ops::mock::{
    ConfluenceCall, DownloadReply, MockConfluenceOps, StartReply,
};
pub use confluence_backup::utils::confluence_ops::ConfluenceOperations;
