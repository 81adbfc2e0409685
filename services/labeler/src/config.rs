use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use serde::Deserialize;

/// Branch hint recorded by the batch driver when none is configured
pub const BATCH_DEFAULT_BRANCH: &str = "unknown";

/// Branch hint recorded by the event handler when none is configured
pub const EVENT_DEFAULT_BRANCH: &str = "Lambda";

/// Entry point the configuration is loaded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Local directory run (`analyze-images`)
    Batch,
    /// Upload-notification handler (`label-handler`)
    Event,
}

impl RunMode {
    /// Flat variable carrying the branch hint in this mode's deployment
    pub fn branch_var(self) -> &'static str {
        match self {
            RunMode::Batch => "GITHUB_REF_NAME",
            RunMode::Event => "BRANCH_HINT",
        }
    }

    /// Branch recorded when no hint is configured
    pub fn default_branch(self) -> &'static str {
        match self {
            RunMode::Batch => BATCH_DEFAULT_BRANCH,
            RunMode::Event => EVENT_DEFAULT_BRANCH,
        }
    }
}

/// Main configuration for the labeler service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Shared AWS SDK configuration
    #[serde(default)]
    pub aws: AwsConfig,
    /// S3 configuration
    #[serde(default)]
    pub s3: S3Config,
    /// Label detection request parameters
    #[serde(default)]
    pub detection: DetectionConfig,
    /// DynamoDB table configuration
    pub table: TableConfig,
    /// Batch driver configuration
    #[serde(default)]
    pub batch: BatchConfig,
    /// Context tag stamped on every record (branch, stage, trigger)
    pub branch: Option<String>,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// AWS SDK configuration shared by all clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsConfig {
    /// AWS region; the SDK provider chain is used when unset
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack, etc.)
    pub endpoint_url: Option<String>,
}

/// S3 storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket the batch driver uploads into
    pub bucket: Option<String>,
    /// Prefix prepended to uploaded file names
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Force path-style access (required for LocalStack)
    #[serde(default)]
    pub force_path_style: bool,
}

/// Request-time parameters passed to the labeling service
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Maximum number of labels returned per image
    #[serde(default = "default_max_labels")]
    pub max_labels: i32,
    /// Confidence floor applied by the labeling service
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

/// DynamoDB table configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Table receiving label records
    pub name: String,
}

/// Batch driver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Local directory scanned for images
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
}

// Default value functions
fn default_service_name() -> String {
    "labeler-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_key_prefix() -> String {
    "rekognition-input".to_string()
}

fn default_max_labels() -> i32 {
    10
}

fn default_min_confidence() -> f32 {
    70.0
}

fn default_images_dir() -> String {
    "images".to_string()
}

impl Config {
    /// Load configuration from config files and environment variables
    pub fn load(mode: RunMode) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .set_default("service.name", default_service_name())?
            .set_default("service.log_level", default_log_level())?
            // Add config file if present
            .add_source(config::File::with_name("config/labeler").required(false))
            .add_source(config::File::with_name("/etc/labeler/labeler").required(false))
            // LABELER__TABLE__NAME -> table.name
            .add_source(
                config::Environment::with_prefix("LABELER")
                    .separator("__")
                    .try_parsing(true),
            );

        // Flat variables set by the existing deployments
        for (key, value) in legacy_overrides(mode, env_var) {
            builder = builder.set_override_option(key, value)?;
        }

        let config = builder.build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Branch hint, or the given mode sentinel when none is configured
    pub fn branch_or(&self, default: &str) -> String {
        self.branch
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Bucket required by the batch driver
    pub fn upload_bucket(&self) -> anyhow::Result<&str> {
        self.s3
            .bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| anyhow::anyhow!("s3.bucket (S3_BUCKET) must be set"))
    }
}

impl AwsConfig {
    /// Load the shared SDK configuration used by every client
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let region_provider = RegionProviderChain::first_try(self.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        // Custom endpoint for LocalStack
        if let Some(ref endpoint_url) = self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
    }
}

/// Config keys overridden by the flat variables of `mode`
///
/// Only the mode's own branch variable is consulted, so a CI runner's
/// `GITHUB_REF_NAME` never leaks into handler records.
fn legacy_overrides(
    mode: RunMode,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<(&'static str, Option<String>)> {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    vec![
        ("s3.bucket", get("S3_BUCKET")),
        (
            "table.name",
            get("DYNAMODB_TABLE").or_else(|| get("DDB_TABLE")),
        ),
        ("branch", get(mode.branch_var())),
        ("aws.region", get("REGION")),
    ]
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: None,
            key_prefix: default_key_prefix(),
            force_path_style: false,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_labels: default_max_labels(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
        }
    }
}
