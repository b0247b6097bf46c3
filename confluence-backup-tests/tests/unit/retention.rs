//! Retention sweeper tests against a real directory

use chrono::{DateTime, Duration, Utc};
use confluence_backup::utils::retention::sweep_old_archives;
use test_utils::{archive_name, TestContext};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T02:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_sweep_keeps_recent_and_foreign_files() {
    let ctx = TestContext::new();
    ctx.create_file_aged(&archive_name("OPS", "20250401"), now(), 61);
    ctx.create_file_aged(&archive_name("OPS", "20250501"), now(), 31);
    ctx.create_file_aged(&archive_name("OPS", "20250525"), now(), 7);
    ctx.create_file_aged(&archive_name("DEV", "20250101"), now(), 151);
    ctx.create_file_aged("notes.txt", now(), 400);

    let report = sweep_old_archives(ctx.temp_dir(), "OPS", 30, now()).unwrap();

    assert_eq!(report.examined, 3);
    assert_eq!(report.deleted.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(
        ctx.list_files(),
        vec![
            archive_name("DEV", "20250101"),
            archive_name("OPS", "20250525"),
            "notes.txt".to_string(),
        ]
    );
}

#[test]
fn test_sweep_one_second_either_side_of_cutoff() {
    let ctx = TestContext::new();
    let cutoff = now() - Duration::days(10);
    ctx.create_file_modified_at(&archive_name("OPS", "old"), cutoff - Duration::seconds(1));
    ctx.create_file_modified_at(&archive_name("OPS", "new"), cutoff + Duration::seconds(1));

    sweep_old_archives(ctx.temp_dir(), "OPS", 10, now()).unwrap();

    assert!(!ctx.file_exists(&archive_name("OPS", "old")));
    assert!(ctx.file_exists(&archive_name("OPS", "new")));
}

#[test]
fn test_sweep_disabled_for_non_positive_days() {
    let ctx = TestContext::new();
    ctx.create_file_aged(&archive_name("OPS", "ancient"), now(), 9000);

    for days in [0, -5] {
        let report = sweep_old_archives(ctx.temp_dir(), "OPS", days, now()).unwrap();
        assert!(report.disabled);
    }
    assert!(ctx.file_exists(&archive_name("OPS", "ancient")));
}

#[test]
fn test_sweep_missing_directory_is_an_error() {
    let ctx = TestContext::new();
    let result = sweep_old_archives(&ctx.temp_dir().join("nope"), "OPS", 10, now());
    assert!(result.is_err());
}
