//! Tests for the 'prune' command
//!
//! Prune runs only the retention sweep against the configured backup dir.

use chrono::{Duration, Utc};
use confluence_backup::utils::retention::sweep_old_archives;
use std::fs;
use std::time::SystemTime;
use test_utils::{archive_name, ConfigBuilder};

#[test]
fn test_prune_uses_configured_dir_and_space() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .with_space("DOCS")
        .with_retention_days(14)
        .persist();
    let now = Utc::now();

    let seed = |name: String, days: i64| {
        let path = config.backup_dir.join(name);
        let file = fs::File::create(&path).unwrap();
        file.set_modified(SystemTime::from(now - Duration::days(days)))
            .unwrap();
        path
    };
    let expired = seed(archive_name("DOCS", "a"), 20);
    let kept = seed(archive_name("DOCS", "b"), 3);
    let foreign = seed(archive_name("OPS", "a"), 20);

    let report = sweep_old_archives(
        &config.backup_dir,
        &config.space_key,
        config.retention_days,
        now,
    )
    .unwrap();

    assert_eq!(report.deleted, vec![expired.clone()]);
    assert!(!expired.exists());
    assert!(kept.exists());
    assert!(foreign.exists());
}

#[test]
fn test_prune_disabled_by_default() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    assert_eq!(config.retention_days, 0);

    let report = sweep_old_archives(
        &config.backup_dir,
        &config.space_key,
        config.retention_days,
        Utc::now(),
    )
    .unwrap();
    assert!(report.disabled);
    assert_eq!(report.examined, 0);
}
