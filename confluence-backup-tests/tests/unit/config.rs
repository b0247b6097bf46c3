//! Configuration loading tests

use confluence_backup::config::{load_config, read_config_file, ConfigError, TlsPolicy};
use std::collections::HashMap;
use std::time::Duration;
use test_utils::test_context::ResultAssertions;
use test_utils::{legacy_config_json, minimal_config_toml, ConfigBuilder, TestContext};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_load_minimal_toml() {
    let ctx = TestContext::new();
    let backups = ctx.create_subdir("backups");
    let path = ctx.create_file("config.toml", &minimal_config_toml(&backups.display().to_string()));

    let config = load_config(&path, env(&[])).assert_ok();

    assert_eq!(config.base_url, "https://wiki.example.com");
    assert_eq!(config.space_key, "OPS");
    assert_eq!(config.token.expose(), "toml-token");
    assert_eq!(config.backup_dir, backups);
    assert_eq!(config.request_timeout, Duration::from_secs(600));
    assert_eq!(config.retention_days, 0);
    assert_eq!(config.tls, TlsPolicy::Verify);
}

#[test]
fn test_load_legacy_json_keys() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.json", &legacy_config_json("/srv/backups"));

    let config = load_config(&path, env(&[])).assert_ok();

    assert_eq!(config.token.expose(), "legacy-token");
    assert_eq!(config.request_timeout, Duration::from_secs(15 * 60));
    assert_eq!(config.retention_days, 30);
    assert_eq!(config.backup_dir, std::path::PathBuf::from("/srv/backups"));
}

#[test]
fn test_environment_overrides_file() {
    let builder = ConfigBuilder::new().with_retention_days(7);
    let path = builder.write_toml("config.toml");

    let config = load_config(
        &path,
        env(&[
            ("CONFLUENCE_BACKUP_SPACE_KEY", "DEV"),
            ("JIRA_RENTENTION_DAYS", "45"),
        ]),
    )
    .assert_ok();

    assert_eq!(config.space_key, "DEV");
    assert_eq!(config.retention_days, 45);
    // untouched fields come from the file
    assert_eq!(config.base_url, "https://wiki.example.com");
}

#[test]
fn test_environment_only() {
    let ctx = TestContext::new();
    let config = load_config(
        ctx.temp_dir().join("absent.toml"),
        env(&[
            ("JIRA_BASE_URL", "https://wiki.example.com/"),
            ("JIRA_SPACE_KEY", "OPS"),
            ("JIRA_TOKEN", "env-token"),
            ("JIRA_TIMEOUT", "0"),
        ]),
    )
    .assert_ok();

    assert_eq!(config.base_url, "https://wiki.example.com");
    assert_eq!(config.request_timeout, Duration::from_secs(600));
}

#[test]
fn test_missing_fields_are_all_reported() {
    let ctx = TestContext::new();
    let err = load_config(ctx.temp_dir().join("absent.toml"), env(&[])).unwrap_err();

    match err {
        ConfigError::MissingFields(fields) => {
            assert_eq!(fields, vec!["base_url", "space_key", "token"])
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_missing_token_from_builder() {
    let builder = ConfigBuilder::new().without_token();
    let path = builder.write_toml("config.toml");

    load_config(&path, env(&[])).assert_err_contains("token");
}

#[test]
fn test_invalid_environment_number() {
    let builder = ConfigBuilder::new();
    let path = builder.write_toml("config.toml");

    load_config(&path, env(&[("JIRA_RENTENTION_DAYS", "thirty")]))
        .assert_err_contains("JIRA_RENTENTION_DAYS");
}

#[test]
fn test_invalid_toml_uses_environment_only() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "base_url = [unclosed");

    assert!(matches!(
        read_config_file(&path),
        Err(ConfigError::ParseError(_))
    ));

    let config = load_config(
        &path,
        env(&[
            ("CONFLUENCE_BACKUP_BASE_URL", "https://wiki.example.com"),
            ("CONFLUENCE_BACKUP_SPACE_KEY", "ENV"),
            ("CONFLUENCE_BACKUP_TOKEN", "env-token"),
        ]),
    )
    .assert_ok();
    assert_eq!(config.space_key, "ENV");

    assert!(matches!(
        load_config(&path, env(&[])),
        Err(ConfigError::MissingFields(_))
    ));
}

#[test]
fn test_json_written_by_builder() {
    let builder = ConfigBuilder::new().with_verify_archive(true);
    let path = builder.write_json("config.json");

    let config = load_config(&path, env(&[])).assert_ok();
    assert!(config.verify_archive);
}
