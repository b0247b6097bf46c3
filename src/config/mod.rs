//! Configuration module for confluence-backup
//!
//! Configuration comes from two layers, merged once at startup:
//!
//! 1. Config file (TOML, or JSON when the file ends in `.json`)
//! 2. Environment variables (`CONFLUENCE_BACKUP_*`, legacy `JIRA_*`)
//!
//! Environment values override file values field by field. The result is an
//! immutable [`CycleConfig`] handed to every stage of the backup cycle.
//!
//! ## Example Usage
//!
//! ```no_run
//! use confluence_backup::config;
//!
//! let config = config::load_config("config.toml", |name| std::env::var(name).ok())?;
//! println!("Backing up space {} into {:?}", config.space_key, config.backup_dir);
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, merge_config, read_config_file, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
