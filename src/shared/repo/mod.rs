//! DynamoDB-backed stores.

pub mod agents;
pub mod ble_allow_list;
pub mod devices;
pub mod pairing_codes;
pub mod params;
pub mod user_tokens;

pub use agents::DynamoAgentStore;
pub use ble_allow_list::DynamoAllowListStore;
pub use devices::DynamoDeviceStore;
pub use pairing_codes::DynamoPairingCodeStore;
pub use params::DynamoParamStore;
pub use user_tokens::DynamoUserTokenStore;

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::error::StoreError;

pub(crate) type Item = HashMap<String, AttributeValue>;

pub(crate) fn required_s(item: &Item, name: &str) -> Result<String, StoreError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| StoreError::Serialization(format!("Missing {}", name)))
}

pub(crate) fn optional_s(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

pub(crate) fn required_n(item: &Item, name: &str) -> Result<i64, StoreError> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| StoreError::Serialization(format!("Missing {}", name)))?
        .parse::<i64>()
        .map_err(|e| StoreError::Serialization(format!("{} is not an integer: {}", name, e)))
}

pub(crate) fn required_bool(item: &Item, name: &str) -> Result<bool, StoreError> {
    item.get(name)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .ok_or_else(|| StoreError::Serialization(format!("Missing {}", name)))
}
