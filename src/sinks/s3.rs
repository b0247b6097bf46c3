//! S3 archive sink
//!
//! Uploads the finished archive to `s3://<bucket>/<prefix>/<file name>`.
//! The AWS SDK is async; the sink owns a current-thread Tokio runtime and
//! blocks on it, the rest of the cycle stays synchronous.

use super::{ArchiveSink, SinkReceipt};
use crate::config::S3Settings;
use crate::error::{BackupError, Result};
use anyhow::Context;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::info;

pub struct S3Sink {
    runtime: tokio::runtime::Runtime,
    client: Client,
    bucket: String,
    key_prefix: String,
}

impl S3Sink {
    pub fn new(settings: &S3Settings) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start runtime for S3 uploads")?;

        let client = runtime.block_on(build_client(settings));

        Ok(Self {
            runtime,
            client,
            bucket: settings.bucket.clone(),
            key_prefix: settings.key_prefix.clone(),
        })
    }
}

async fn build_client(settings: &S3Settings) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }

    // Static keys from config win over the default provider chain
    if let (Some(access_key), Some(secret_key)) = (&settings.access_key, &settings.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.expose(),
            secret_key.expose(),
            None,
            None,
            "confluence-backup",
        ));
    }

    if let Some(endpoint) = &settings.endpoint {
        loader = loader.endpoint_url(endpoint.clone());
    }

    let shared = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(settings.endpoint.is_some())
        .build();

    Client::from_conf(s3_config)
}

/// Object key for an archive file name
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

impl ArchiveSink for S3Sink {
    fn store(&self, archive: &Path) -> Result<SinkReceipt> {
        let upload_failed = |reason: String| BackupError::UploadFailed {
            sink: self.name().to_string(),
            path: archive.to_path_buf(),
            reason,
        };

        let file_name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| upload_failed("archive path has no file name".to_string()))?;
        let key = object_key(&self.key_prefix, file_name);
        let location = format!("s3://{}/{}", self.bucket, key);

        info!("Uploading {:?} to {}", archive, location);

        self.runtime.block_on(async {
            let body = ByteStream::from_path(archive)
                .await
                .map_err(|e| upload_failed(e.to_string()))?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type("application/zip")
                .body(body)
                .send()
                .await
                .map_err(|e| upload_failed(format!("{:?}", e)))?;

            Ok::<(), BackupError>(())
        })?;

        info!("Uploaded archive to {}", location);
        Ok(SinkReceipt {
            location: Some(location),
        })
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
