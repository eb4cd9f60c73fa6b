use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use super::{optional_s, required_bool, required_s, Item};
use crate::domain::UserToken;
use crate::error::StoreError;
use crate::store::UserTokenStore;

/// User bearer tokens keyed by `token_hash`
#[derive(Debug, Clone)]
pub struct DynamoUserTokenStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoUserTokenStore {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl UserTokenStore for DynamoUserTokenStore {
    async fn get_by_hash(&self, token_hash: &str) -> Result<Option<UserToken>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("token_hash", AttributeValue::S(token_hash.to_string()))
            .send()
            .await?;

        result.item.as_ref().map(item_to_user_token).transpose()
    }

    /// Callers throttle this; it runs at most once per token per few minutes
    async fn update_last_used(&self, token_hash: &str, timestamp: &str) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("token_hash", AttributeValue::S(token_hash.to_string()))
            .update_expression("SET last_used_at = :now")
            .condition_expression("attribute_exists(token_hash)")
            .expression_attribute_values(":now", AttributeValue::S(timestamp.to_string()))
            .send()
            .await?;
        Ok(())
    }
}

fn item_to_user_token(item: &Item) -> Result<UserToken, StoreError> {
    Ok(UserToken {
        token_hash: required_s(item, "token_hash")?,
        user_id: required_s(item, "user_id")?,
        is_active: required_bool(item, "is_active")?,
        created_at: required_s(item, "created_at")?,
        last_used_at: optional_s(item, "last_used_at"),
    })
}
