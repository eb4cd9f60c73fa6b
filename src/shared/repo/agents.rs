use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;

use crate::domain::Agent;
use crate::error::StoreError;
use crate::store::AgentStore;

/// Agents keyed by `agent_id`, written by the agent management service
#[derive(Debug, Clone)]
pub struct DynamoAgentStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoAgentStore {
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl AgentStore for DynamoAgentStore {
    async fn get(&self, agent_id: &str) -> Result<Option<Agent>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("agent_id", AttributeValue::S(agent_id.to_string()))
            .send()
            .await?;

        match result.item {
            // Module configs are free-form maps, so let serde_dynamo walk them
            Some(item) => Ok(Some(serde_dynamo::from_item(item)?)),
            None => Ok(None),
        }
    }
}
