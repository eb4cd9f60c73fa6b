use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use super::Item;
use crate::domain::SystemParam;
use crate::error::StoreError;
use crate::store::ParamStore;

/// System parameters keyed by `param_code`
#[derive(Debug, Clone)]
pub struct DynamoParamStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoParamStore {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl ParamStore for DynamoParamStore {
    async fn list(&self) -> Result<Vec<SystemParam>, StoreError> {
        let mut params = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await?;

            let page: Vec<SystemParam> = serde_dynamo::from_items(result.items.unwrap_or_default())?;
            params.extend(page);

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamValueType;
    use aws_sdk_dynamodb::types::AttributeValue;

    #[test]
    fn test_param_items_without_type_default_to_string() {
        let mut typed = Item::new();
        typed.insert("param_code".to_string(), AttributeValue::S("server.port".to_string()));
        typed.insert("param_value".to_string(), AttributeValue::S("8000".to_string()));
        typed.insert("value_type".to_string(), AttributeValue::S("number".to_string()));

        let mut untyped = Item::new();
        untyped.insert("param_code".to_string(), AttributeValue::S("server.ip".to_string()));
        untyped.insert("param_value".to_string(), AttributeValue::S("0.0.0.0".to_string()));

        let params: Vec<SystemParam> = serde_dynamo::from_items(vec![typed, untyped]).unwrap();
        assert_eq!(params[0].value_type, ParamValueType::Number);
        assert_eq!(params[1].value_type, ParamValueType::String);
    }
}
