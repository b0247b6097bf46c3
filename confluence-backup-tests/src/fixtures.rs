//! Test fixtures and sample data

use std::io::{Cursor, Write};

/// Archive name in the format the server produces
pub fn archive_name(space_key: &str, stamp: &str) -> String {
    format!("Confluence-space-export-{}-{}.zip", space_key, stamp)
}

/// A small but valid zip archive with the given entries
///
/// Entry timestamps are fixed so equal inputs give identical bytes.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let options =
        zip::write::SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, options)
            .expect("Failed to start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("Failed to write zip entry");
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

/// Zip archive shaped like a space export
pub fn sample_space_export() -> Vec<u8> {
    zip_bytes(&[
        ("entities.xml", "<hibernate-generic/>"),
        ("exportDescriptor.properties", "spaceKey=OPS\n"),
    ])
}

/// Legacy `config.json` using the flat lowercase keys
pub fn legacy_config_json(backup_dir: &str) -> String {
    format!(
        r#"{{
  "baseurl": "https://wiki.example.com",
  "spacekey": "OPS",
  "token": "legacy-token",
  "backupdir": "{}",
  "timeout": 15,
  "retentiondays": 30
}}"#,
        backup_dir
    )
}

/// Minimal valid config TOML
pub fn minimal_config_toml(backup_dir: &str) -> String {
    format!(
        r#"
base_url = "https://wiki.example.com"
space_key = "OPS"
token = "toml-token"
backup_dir = "{}"
"#,
        backup_dir
    )
}
