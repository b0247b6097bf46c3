//! Backup cycle tests with a mocked Confluence server and sink

use confluence_backup::error::BackupError;
use confluence_backup::managers::cycle::{BackupCycle, CycleStage};
use confluence_backup::utils::poller::{CancelToken, PollPolicy};
use std::fs;
use std::time::Duration;
use test_utils::{
    archive_name, sample_space_export, ConfigBuilder, ConfluenceCall, DownloadReply, JobId,
    JobState, MockConfluenceOps, RecordingSink,
};

fn fast_policy() -> PollPolicy {
    PollPolicy::unbounded(Duration::ZERO)
}

fn finished_mock(job_id: u64, file_name: &str) -> MockConfluenceOps {
    MockConfluenceOps::new()
        .with_job_id(job_id)
        .then_status(JobState::Pending, None)
        .then_status(JobState::Running, None)
        .then_status(JobState::Finished, Some(file_name))
        .with_download(DownloadReply::Bytes(sample_space_export()))
}

#[test]
fn test_cycle_downloads_and_verifies_export() {
    let name = archive_name("OPS", "20250601");
    let (config, _temp_dir) = ConfigBuilder::new().with_verify_archive(true).persist();
    let backup_dir = config.backup_dir.clone();
    let mock = finished_mock(42, &name);
    let sink = RecordingSink::new();

    let report = BackupCycle::new(config, Box::new(mock.clone()), Box::new(sink.clone()))
        .with_poll_policy(fast_policy())
        .run()
        .unwrap();

    assert_eq!(report.job_id, JobId(42));
    assert_eq!(report.archive_entries, Some(2));
    assert_eq!(report.archive.path, backup_dir.join(&name));
    assert_eq!(
        fs::read(&report.archive.path).unwrap(),
        sample_space_export()
    );
    assert_eq!(sink.stored(), vec![backup_dir.join(&name)]);

    assert_eq!(
        mock.get_calls(),
        vec![
            ConfluenceCall::StartBackup {
                space_key: "OPS".to_string()
            },
            ConfluenceCall::JobStatus { job_id: JobId(42) },
            ConfluenceCall::JobStatus { job_id: JobId(42) },
            ConfluenceCall::JobStatus { job_id: JobId(42) },
            ConfluenceCall::Download {
                job_id: JobId(42),
                file_name: name,
            },
        ]
    );
}

#[test]
fn test_server_path_in_file_name_is_stripped() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let backup_dir = config.backup_dir.clone();
    let mock = finished_mock(5, "../../etc/Confluence-space-export-OPS-1.zip");

    let report = BackupCycle::new(config, Box::new(mock), Box::new(RecordingSink::new()))
        .with_poll_policy(fast_policy())
        .run()
        .unwrap();

    assert_eq!(
        report.archive.path,
        backup_dir.join("Confluence-space-export-OPS-1.zip")
    );
}

#[test]
fn test_poll_attempt_limit_fails_cycle() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let mock = MockConfluenceOps::new().then_status(JobState::Running, None);

    let err = BackupCycle::new(config, Box::new(mock.clone()), Box::new(RecordingSink::new()))
        .with_poll_policy(fast_policy().with_max_attempts(4))
        .run()
        .unwrap_err();

    assert_eq!(err.stage, CycleStage::Polling);
    assert!(matches!(err.source, BackupError::PollExhausted { attempts: 4, .. }));
    assert_eq!(mock.status_calls(), 4);
    assert!(!mock.download_called());
}

#[test]
fn test_cancelled_cycle_stops_before_download() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let mock = MockConfluenceOps::new().then_status(JobState::Running, None);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = BackupCycle::new(config, Box::new(mock.clone()), Box::new(RecordingSink::new()))
        .with_poll_policy(fast_policy().with_cancel(cancel))
        .run()
        .unwrap_err();

    assert!(matches!(err.source, BackupError::PollCancelled { .. }));
    assert!(!mock.download_called());
}

#[test]
fn test_refused_download_fails_without_partial_file() {
    let name = archive_name("OPS", "x");
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let backup_dir = config.backup_dir.clone();
    let mock = finished_mock(3, &name).with_download(DownloadReply::Refused("403 Forbidden".to_string()));
    let sink = RecordingSink::new();

    let err = BackupCycle::new(config, Box::new(mock), Box::new(sink.clone()))
        .with_poll_policy(fast_policy())
        .run()
        .unwrap_err();

    assert!(matches!(err.source, BackupError::DownloadFailed { .. }));
    assert_eq!(err.source.partial_download(), None);
    assert!(!backup_dir.join(&name).exists());
    assert!(sink.stored().is_empty());
}
