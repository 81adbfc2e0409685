use crate::config::TableConfig;
use crate::item::Item;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client as DynamoClient;
use tracing::{debug, instrument};

/// Durable key-value table of label records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Write `item`, replacing any record with the same filename
    async fn put_item(&self, item: &Item) -> Result<()>;
}

/// DynamoDB-backed [`ItemStore`]
///
/// Writes are unconditional `PutItem` calls: the last write for a filename wins.
pub struct DynamoItemStore {
    client: DynamoClient,
    table: String,
}

impl DynamoItemStore {
    pub fn new(sdk_config: &SdkConfig, config: &TableConfig) -> Self {
        Self {
            client: DynamoClient::new(sdk_config),
            table: config.name.clone(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl ItemStore for DynamoItemStore {
    #[instrument(skip(self, item), fields(table = %self.table, filename = %item.filename))]
    async fn put_item(&self, item: &Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item.to_attributes()))
            .send()
            .await
            .with_context(|| format!("Failed to write item to DynamoDB table {}", self.table))?;

        debug!(label_count = item.labels.len(), "Item written");
        Ok(())
    }
}
