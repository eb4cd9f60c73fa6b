use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use super::{required_n, required_s, Item};
use crate::domain::PairingCode;
use crate::error::StoreError;
use crate::store::PairingCodeStore;

/// Pairing codes keyed by `code`; `expires_at` doubles as the table TTL attribute
#[derive(Debug, Clone)]
pub struct DynamoPairingCodeStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoPairingCodeStore {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl PairingCodeStore for DynamoPairingCodeStore {
    async fn claim(&self, code: &PairingCode, now_epoch_seconds: i64) -> Result<bool, StoreError> {
        // TTL deletion is lazy, so an expired entry may still be present
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(pairing_code_to_item(code)))
            .condition_expression("attribute_not_exists(code) OR expires_at <= :now")
            .expression_attribute_values(":now", AttributeValue::N(now_epoch_seconds.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let collision = err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if collision {
                    Ok(false)
                } else {
                    Err(StoreError::from(err))
                }
            }
        }
    }

    async fn get(&self, code: &str) -> Result<Option<PairingCode>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("code", AttributeValue::S(code.to_string()))
            .consistent_read(true)
            .send()
            .await?;

        result.item.as_ref().map(item_to_pairing_code).transpose()
    }

    async fn delete_for_mac(&self, code: &str, mac_address: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("code", AttributeValue::S(code.to_string()))
            .condition_expression("mac_address = :mac")
            .expression_attribute_values(":mac", AttributeValue::S(mac_address.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                // Gone already, or re-issued to another device
                let reassigned = err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if reassigned {
                    Ok(())
                } else {
                    Err(StoreError::from(err))
                }
            }
        }
    }
}

fn pairing_code_to_item(code: &PairingCode) -> Item {
    let mut item = Item::new();
    item.insert("code".to_string(), AttributeValue::S(code.code.clone()));
    item.insert(
        "mac_address".to_string(),
        AttributeValue::S(code.mac_address.clone()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::N(code.created_at.to_string()),
    );
    item.insert(
        "expires_at".to_string(),
        AttributeValue::N(code.expires_at.to_string()),
    );
    item
}

fn item_to_pairing_code(item: &Item) -> Result<PairingCode, StoreError> {
    Ok(PairingCode {
        code: required_s(item, "code")?,
        mac_address: required_s(item, "mac_address")?,
        created_at: required_n(item, "created_at")?,
        expires_at: required_n(item, "expires_at")?,
    })
}
