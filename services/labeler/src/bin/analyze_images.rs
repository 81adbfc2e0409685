use anyhow::{Context, Result};
use labeler::config::{Config, RunMode};
use labeler::{BatchDriver, DynamoItemStore, RekognitionDetector, S3Uploader};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load(RunMode::Batch).context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    let bucket = config.upload_bucket()?.to_string();
    let branch = config.branch_or(RunMode::Batch.default_branch());

    info!(
        service = %config.service.name,
        bucket = %bucket,
        table = %config.table.name,
        branch = %branch,
        images_dir = %config.batch.images_dir,
        "Starting batch labeling"
    );

    let sdk_config = config.aws.load_sdk_config().await;

    let driver = BatchDriver::new(
        Arc::new(S3Uploader::new(&sdk_config, &config.s3)),
        Arc::new(RekognitionDetector::new(&sdk_config, &config.detection)),
        Arc::new(DynamoItemStore::new(&sdk_config, &config.table)),
        bucket,
        config.s3.key_prefix.clone(),
        branch,
    );

    driver
        .run(Path::new(&config.batch.images_dir))
        .await
        .context("Batch labeling failed")?;

    Ok(())
}

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the configured level. Output is JSON, one event per line.
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_current_span(false))
        .init();
}
