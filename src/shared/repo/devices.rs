use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use super::{optional_s, required_bool, required_s, Item};
use crate::domain::Device;
use crate::error::StoreError;
use crate::store::DeviceStore;

/// GSI keyed by the device UUID
pub const ID_INDEX: &str = "id-index";

/// GSI listing a user's devices (gsi1pk=user_id, gsi1sk=agent_id#bound_at)
pub const USER_AGENT_INDEX: &str = "gsi1";

/// Devices table keyed by `device_code`
#[derive(Debug, Clone)]
pub struct DynamoDeviceStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDeviceStore {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl DeviceStore for DynamoDeviceStore {
    async fn get_by_code(&self, device_code: &str) -> Result<Option<Device>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("device_code", AttributeValue::S(device_code.to_string()))
            .send()
            .await?;

        result.item.as_ref().map(item_to_device).transpose()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Device>, StoreError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(ID_INDEX)
            .key_condition_expression("id = :id")
            .expression_attribute_values(":id", AttributeValue::S(id.to_string()))
            .limit(1)
            .send()
            .await?;

        result
            .items
            .unwrap_or_default()
            .first()
            .map(item_to_device)
            .transpose()
    }

    async fn create(&self, device: &Device) -> Result<bool, StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(device_to_item(device)))
            .condition_expression("attribute_not_exists(device_code)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let lost_race = err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if lost_race {
                    Ok(false)
                } else {
                    Err(StoreError::from(err))
                }
            }
        }
    }

    async fn put(&self, device: &Device) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(device_to_item(device)))
            .send()
            .await?;
        Ok(())
    }

    async fn list_by_user_agent(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Vec<Device>, StoreError> {
        let mut devices = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_AGENT_INDEX)
                .key_condition_expression("gsi1pk = :user AND begins_with(gsi1sk, :agent)")
                .expression_attribute_values(":user", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":agent", AttributeValue::S(format!("{}#", agent_id)))
                .scan_index_forward(false)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await?;

            for item in result.items.unwrap_or_default() {
                devices.push(item_to_device(&item)?);
            }

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(devices)
    }

    async fn delete_owned(&self, device_code: &str, user_id: &str) -> Result<bool, StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("device_code", AttributeValue::S(device_code.to_string()))
            .condition_expression("user_id = :user")
            .expression_attribute_values(":user", AttributeValue::S(user_id.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_owned = err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if not_owned {
                    Ok(false)
                } else {
                    Err(StoreError::from(err))
                }
            }
        }
    }

    async fn touch_last_connected(
        &self,
        device_code: &str,
        timestamp: &str,
    ) -> Result<(), StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("device_code", AttributeValue::S(device_code.to_string()))
            .update_expression("SET last_connected_at = :ts")
            .condition_expression("attribute_exists(device_code)")
            .expression_attribute_values(":ts", AttributeValue::S(timestamp.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            // Unbound in the meantime
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Ok(())
            }
            Err(err) => Err(StoreError::from(err)),
        }
    }
}

fn device_to_item(device: &Device) -> Item {
    let mut item = Item::new();

    item.insert(
        "device_code".to_string(),
        AttributeValue::S(device.device_code.clone()),
    );
    item.insert("id".to_string(), AttributeValue::S(device.id.clone()));
    item.insert(
        "mac_address".to_string(),
        AttributeValue::S(device.mac_address.clone()),
    );
    item.insert("user_id".to_string(), AttributeValue::S(device.user_id.clone()));
    item.insert("agent_id".to_string(), AttributeValue::S(device.agent_id.clone()));

    if let Some(ref remark) = device.remark {
        item.insert("remark".to_string(), AttributeValue::S(remark.clone()));
    }

    item.insert("auto_update".to_string(), AttributeValue::Bool(device.auto_update));
    item.insert("bound_at".to_string(), AttributeValue::S(device.bound_at.clone()));
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(device.updated_at.clone()),
    );

    if let Some(ref last_connected_at) = device.last_connected_at {
        item.insert(
            "last_connected_at".to_string(),
            AttributeValue::S(last_connected_at.clone()),
        );
    }

    // RFC3339 timestamps sort lexicographically, newest last
    item.insert("gsi1pk".to_string(), AttributeValue::S(device.user_id.clone()));
    item.insert(
        "gsi1sk".to_string(),
        AttributeValue::S(format!("{}#{}", device.agent_id, device.bound_at)),
    );

    item
}

fn item_to_device(item: &Item) -> Result<Device, StoreError> {
    Ok(Device {
        id: required_s(item, "id")?,
        device_code: required_s(item, "device_code")?,
        mac_address: required_s(item, "mac_address")?,
        user_id: required_s(item, "user_id")?,
        agent_id: required_s(item, "agent_id")?,
        remark: optional_s(item, "remark"),
        auto_update: required_bool(item, "auto_update")?,
        bound_at: required_s(item, "bound_at")?,
        updated_at: required_s(item, "updated_at")?,
        last_connected_at: optional_s(item, "last_connected_at"),
    })
}
