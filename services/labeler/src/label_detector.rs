use crate::config::DetectionConfig;
use crate::labels::LabelingResponse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client as RekognitionClient;
use tracing::{debug, info, instrument};

/// Image labeling service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Detect labels on an image already stored at `bucket`/`key`
    async fn detect_labels(&self, bucket: &str, key: &str) -> Result<LabelingResponse>;
}

/// Rekognition-backed [`LabelDetector`]
pub struct RekognitionDetector {
    client: RekognitionClient,
    max_labels: i32,
    min_confidence: f32,
}

impl RekognitionDetector {
    pub fn new(sdk_config: &SdkConfig, config: &DetectionConfig) -> Self {
        info!(
            max_labels = config.max_labels,
            min_confidence = config.min_confidence,
            "Rekognition detector initialized"
        );

        Self {
            client: RekognitionClient::new(sdk_config),
            max_labels: config.max_labels,
            min_confidence: config.min_confidence,
        }
    }
}

#[async_trait]
impl LabelDetector for RekognitionDetector {
    #[instrument(skip(self))]
    async fn detect_labels(&self, bucket: &str, key: &str) -> Result<LabelingResponse> {
        let image = Image::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();

        let output = self
            .client
            .detect_labels()
            .image(image)
            .max_labels(self.max_labels)
            .min_confidence(self.min_confidence)
            .send()
            .await
            .with_context(|| format!("Failed to detect labels for s3://{}/{}", bucket, key))?;

        debug!(label_count = output.labels().len(), "Labels detected");

        Ok(output.into())
    }
}
