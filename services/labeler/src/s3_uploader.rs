use crate::config::S3Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info, instrument};

/// Object storage addressed by bucket and key
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` at `bucket`/`key`, replacing any existing object
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

/// S3-backed [`ObjectStore`]
pub struct S3Uploader {
    client: S3Client,
}

impl S3Uploader {
    /// Create a new S3 uploader
    pub fn new(sdk_config: &SdkConfig, config: &S3Config) -> Self {
        let mut s3_config_builder = S3ConfigBuilder::from(sdk_config);

        // Force path-style access for LocalStack compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = ?config.bucket,
            key_prefix = %config.key_prefix,
            "S3 uploader initialized"
        );

        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Uploader {
    #[instrument(skip(self, body), fields(size_bytes = body.len()))]
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        debug!("Uploading image to S3");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(get_content_type(key))
            .send()
            .await
            .with_context(|| format!("Failed to upload s3://{}/{}", bucket, key))?;

        Ok(())
    }
}

/// Get content type for an image key from its extension
pub fn get_content_type(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
