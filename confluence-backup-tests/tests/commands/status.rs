//! Tests for the 'status' command
//!
//! Status queries a single job; these tests cover the parsing and the
//! mocked query path.

use confluence_backup::utils::confluence::{parse_job_status, ConfluenceClient};
use test_utils::{ConfluenceOperations, JobId, JobState, MockConfluenceOps};

#[test]
fn test_status_parses_finished_job() {
    let status = parse_job_status(
        r#"{"jobState": "FINISHED", "fileName": "Confluence-space-export-OPS-1.zip", "fileExists": true}"#,
    )
    .unwrap();

    assert_eq!(status.state, JobState::Finished);
    assert!(status.state.is_terminal());
    assert_eq!(
        status.file_name.as_deref(),
        Some("Confluence-space-export-OPS-1.zip")
    );
    assert!(status.file_exists);
}

#[test]
fn test_status_unknown_state_is_not_terminal() {
    let status = parse_job_status(r#"{"jobState": "ARCHIVING"}"#).unwrap();
    assert_eq!(status.state, JobState::Other("ARCHIVING".to_string()));
    assert!(!status.state.is_terminal());
}

#[test]
fn test_status_query_uses_job_id() {
    let mock = MockConfluenceOps::new().then_status(JobState::Running, None);

    let status = mock.job_status(JobId(314)).unwrap();
    assert_eq!(status.state, JobState::Running);
    assert_eq!(mock.polled_job_ids(), vec![JobId(314)]);
}

#[test]
fn test_status_transport_error() {
    let mock = MockConfluenceOps::new().then_status_error("connection refused");
    let err = mock.job_status(JobId(1)).unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_status_url() {
    let (config, _temp_dir) = test_utils::ConfigBuilder::new()
        .with_base_url("https://wiki.example.com/")
        .persist();
    let client = ConfluenceClient::from_config(&config).unwrap();

    assert_eq!(
        client.job_url(JobId(314)),
        "https://wiki.example.com/rest/api/backup-restore/jobs/314"
    );
}
