//! Tests for the 'validate' command
//!
//! The validate command loads the configuration and prints the effective values.

use confluence_backup::config::{load_config, TlsMode, TlsPolicy};
use test_utils::test_context::ResultAssertions;
use test_utils::{ConfigBuilder, TestContext};

#[test]
fn test_validate_builder_config() {
    let builder = ConfigBuilder::new().with_timeout_minutes(25);
    let path = builder.write_toml("config.toml");

    let config = load_config(&path, |_| None).assert_ok();
    assert_eq!(config.request_timeout.as_secs(), 25 * 60);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.max_files, 10);
    assert_eq!(config.logging.directory, None);
}

#[test]
fn test_validate_pinned_tls_requires_ca_cert() {
    let builder = ConfigBuilder::new().with_tls_mode(TlsMode::Pinned);
    let path = builder.write_toml("config.toml");

    load_config(&path, |_| None).assert_err_contains("ca_cert");
}

#[test]
fn test_validate_insecure_tls_is_opt_in() {
    let builder = ConfigBuilder::new();
    let path = builder.write_toml("config.toml");
    assert_eq!(load_config(&path, |_| None).assert_ok().tls, TlsPolicy::Verify);

    let builder = ConfigBuilder::new().with_tls_mode(TlsMode::Insecure);
    let path = builder.write_toml("config.toml");
    assert_eq!(load_config(&path, |_| None).assert_ok().tls, TlsPolicy::Insecure);
}

#[test]
fn test_validate_rejects_non_http_base_url() {
    let builder = ConfigBuilder::new().with_base_url("wiki.example.com");
    let path = builder.write_toml("config.toml");

    load_config(&path, |_| None).assert_err_contains("base_url");
}

#[test]
fn test_validate_log_directory() {
    let ctx = TestContext::new();
    let logs = ctx.create_subdir("logs");
    let builder = ConfigBuilder::new().with_log_dir(&logs);
    let path = builder.write_toml("config.toml");

    let config = load_config(&path, |_| None).assert_ok();
    assert_eq!(config.logging.directory, Some(logs));
}

#[test]
fn test_validate_empty_file_needs_environment() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "");

    load_config(&path, |_| None).assert_err_contains("base_url, space_key, token");

    let config = load_config(&path, |name| match name {
        "CONFLUENCE_BACKUP_BASE_URL" => Some("https://wiki.example.com".to_string()),
        "CONFLUENCE_BACKUP_SPACE_KEY" => Some("OPS".to_string()),
        "CONFLUENCE_BACKUP_TOKEN" => Some("t".to_string()),
        _ => None,
    })
    .assert_ok();
    assert_eq!(config.space_key, "OPS");
}
