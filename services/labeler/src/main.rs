use anyhow::Context;
use labeler::config::{Config, RunMode};
use labeler::{DynamoItemStore, EventHandler, RekognitionDetector};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load configuration
    let config = Config::load(RunMode::Event).context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    let sdk_config = config.aws.load_sdk_config().await;
    let detector = Arc::new(RekognitionDetector::new(&sdk_config, &config.detection));
    let store = Arc::new(DynamoItemStore::new(&sdk_config, &config.table));
    let branch = config.branch_or(RunMode::Event.default_branch());

    info!(
        service = %config.service.name,
        table = %store.table(),
        branch = %branch,
        "Starting label handler"
    );

    let handler = Arc::new(EventHandler::new(detector, store, branch));

    run(service_fn(move |event: LambdaEvent<serde_json::Value>| {
        let handler = handler.clone();
        async move { Ok::<_, Error>(handler.handle(&event.payload).await) }
    }))
    .await
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
