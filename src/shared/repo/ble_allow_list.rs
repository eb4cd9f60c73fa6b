use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use crate::domain::AllowListEntry;
use crate::error::StoreError;
use crate::store::AllowListStore;

/// Bluetooth allow-list keyed by `ble_name` (partition) and `flag` (sort)
#[derive(Debug, Clone)]
pub struct DynamoAllowListStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoAllowListStore {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl AllowListStore for DynamoAllowListStore {
    async fn contains(&self, entry: &AllowListEntry) -> Result<bool, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("ble_name", AttributeValue::S(entry.ble_name.clone()))
            .key("flag", AttributeValue::S(entry.flag.clone()))
            .projection_expression("ble_name")
            .send()
            .await?;

        Ok(result.item.is_some())
    }
}
