//! Command tests for confluence-backup
//!
//! These tests drive the library calls behind each CLI command using
//! mocked remote operations.

mod prune;
mod run;
mod status;
mod validate;
