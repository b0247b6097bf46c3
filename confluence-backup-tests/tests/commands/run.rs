//! Tests for the 'run' command
//!
//! The run command executes one full backup cycle.

use confluence_backup::error::BackupError;
use confluence_backup::managers::cycle::{BackupCycle, CycleStage};
use confluence_backup::sinks::NoopSink;
use confluence_backup::utils::job_marker;
use confluence_backup::utils::poller::PollPolicy;
use std::time::Duration;
use test_utils::{
    archive_name, sample_space_export, ConfigBuilder, DownloadReply, JobId, JobState,
    MockConfluenceOps, RecordingSink, StartReply,
};

fn mock_for(name: &str) -> MockConfluenceOps {
    MockConfluenceOps::new()
        .with_job_id(42)
        .then_status(JobState::Running, None)
        .then_status(JobState::Running, None)
        .then_status(JobState::Finished, Some(name))
        .with_download(DownloadReply::Bytes(sample_space_export()))
}

#[test]
fn test_run_polls_the_triggered_job() {
    let name = archive_name("OPS", "20250601");
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let mock = mock_for(&name);

    let report = BackupCycle::new(config, Box::new(mock.clone()), Box::new(NoopSink))
        .with_poll_policy(PollPolicy::unbounded(Duration::ZERO))
        .run()
        .unwrap();

    assert_eq!(mock.polled_job_ids(), vec![JobId(42); 3]);
    assert_eq!(report.upload.location, None);
    assert!(report.archive.path.ends_with(&name));
    assert_eq!(report.archive.bytes, sample_space_export().len() as u64);
}

#[test]
fn test_run_rotates_then_uploads() {
    let name = archive_name("OPS", "20250601");
    let (config, _temp_dir) = ConfigBuilder::new()
        .with_retention_days(30)
        .with_s3_bucket("archives", "confluence")
        .persist();
    let old = config.backup_dir.join(archive_name("OPS", "20250101"));
    let file = std::fs::File::create(&old).unwrap();
    file.set_modified(std::time::SystemTime::now() - Duration::from_secs(90 * 86400))
        .unwrap();
    drop(file);

    let sink = RecordingSink::new().with_location("s3://archives/confluence");
    let report = BackupCycle::new(config, Box::new(mock_for(&name)), Box::new(sink.clone()))
        .with_poll_policy(PollPolicy::unbounded(Duration::ZERO))
        .run()
        .unwrap();

    assert!(!old.exists());
    assert_eq!(report.sweep.unwrap().deleted, vec![old]);
    assert_eq!(sink.stored(), vec![report.archive.path.clone()]);
    // local copy kept unless delete_after_upload is set
    assert!(!report.local_removed);
    assert!(report.archive.path.exists());
}

#[test]
fn test_run_fails_on_rejected_trigger() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let mock = MockConfluenceOps::new().with_start_reply(StartReply::Rejected {
        status: 401,
        body: "unauthorized".to_string(),
    });

    let err = BackupCycle::new(config, Box::new(mock), Box::new(NoopSink))
        .run()
        .unwrap_err();

    assert_eq!(err.stage, CycleStage::Start);
    assert!(matches!(
        err.source,
        BackupError::RemoteRejected { status: 401, .. }
    ));
}

#[test]
fn test_run_resumes_after_interrupted_poll() {
    let name = archive_name("OPS", "20250601");
    let (config, _temp_dir) = ConfigBuilder::new().with_resume_pending_job(true).persist();
    let backup_dir = config.backup_dir.clone();

    // first run: trigger succeeds, polling breaks
    let broken = MockConfluenceOps::new()
        .with_job_id(77)
        .then_status_error("connection reset");
    let err = BackupCycle::new(config.clone(), Box::new(broken), Box::new(NoopSink))
        .with_poll_policy(PollPolicy::unbounded(Duration::ZERO))
        .run()
        .unwrap_err();
    assert!(matches!(err.source, BackupError::PollFailed { .. }));
    assert!(job_marker::marker_path(&backup_dir, "OPS").exists());

    // second run picks the same job up
    let mock = mock_for(&name);
    let report = BackupCycle::new(config, Box::new(mock.clone()), Box::new(NoopSink))
        .with_poll_policy(PollPolicy::unbounded(Duration::ZERO))
        .run()
        .unwrap();

    assert!(report.resumed);
    assert_eq!(report.job_id, JobId(77));
    assert!(!mock.start_called());
    assert_eq!(mock.polled_job_ids(), vec![JobId(77); 3]);
    assert!(!job_marker::marker_path(&backup_dir, "OPS").exists());
}
