use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use voice_device_backend::repo::{
    DynamoAgentStore, DynamoAllowListStore, DynamoDeviceStore, DynamoParamStore,
};
use voice_device_backend::shared::authorization::{IotSolutionClient, MacAuthorizer};
use voice_device_backend::store::{AgentStore, AllowListStore, DeviceStore, ParamStore};
use voice_device_backend::{Clock, SystemClock};

/// Default timeout for authorization service calls
pub const DEFAULT_IOT_SOLUTION_TIMEOUT_SECS: u64 = 10;

/// Environment settings for the edge config API
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSettings {
    pub devices_table: String,
    pub agents_table: String,
    pub params_table: String,
    pub ble_allow_list_table: String,
    /// Bearer secret the edge servers present
    pub server_secret: String,
    pub iot_solution_url: String,
    pub iot_solution_token: Option<String>,
    pub iot_solution_timeout: Duration,
    pub cors_allowed_origin: String,
}

impl EdgeSettings {
    /// Read settings through `lookup`, normally `std::env::var`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let timeout_secs = match lookup("IOT_SOLUTION_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(format!("IOT_SOLUTION_TIMEOUT_SECS={}", raw))
                })?,
            None => DEFAULT_IOT_SOLUTION_TIMEOUT_SECS,
        };

        let iot_solution_url = required("IOT_SOLUTION_URL")?;
        url::Url::parse(&iot_solution_url)
            .map_err(|e| ConfigError::InvalidValue(format!("IOT_SOLUTION_URL: {}", e)))?;

        Ok(EdgeSettings {
            devices_table: required("DEVICES_TABLE")?,
            agents_table: required("AGENTS_TABLE")?,
            params_table: required("PARAMS_TABLE")?,
            ble_allow_list_table: required("BLE_ALLOW_LIST_TABLE")?,
            server_secret: required("SERVER_SECRET")?,
            iot_solution_url,
            iot_solution_token: lookup("IOT_SOLUTION_TOKEN").filter(|t| !t.trim().is_empty()),
            iot_solution_timeout: Duration::from_secs(timeout_secs),
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN").unwrap_or_else(|| "*".to_string()),
        })
    }
}

/// Everything an edge request needs, built once per cold start
pub struct EdgeState {
    pub devices: Arc<dyn DeviceStore>,
    pub agents: Arc<dyn AgentStore>,
    pub params: Arc<dyn ParamStore>,
    pub allow_list: Arc<dyn AllowListStore>,
    pub authorizer: Arc<dyn MacAuthorizer>,
    pub clock: Arc<dyn Clock>,
    pub server_secret: String,
    pub cors_allowed_origin: String,
}

impl EdgeState {
    /// Create the state from environment variables and the default AWS config
    pub async fn from_env() -> Result<Self, ConfigError> {
        let settings = EdgeSettings::from_lookup(|name| std::env::var(name).ok())?;

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let dynamodb_config = aws_sdk_dynamodb::config::Builder::from(&aws_config)
            .timeout_config(
                aws_sdk_dynamodb::config::timeout::TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(25)) // Leave 5s buffer for Lambda timeout
                    .operation_attempt_timeout(Duration::from_secs(10))
                    .build(),
            )
            .build();

        let client = DynamoDbClient::from_conf(dynamodb_config);

        let authorizer = IotSolutionClient::new(
            &settings.iot_solution_url,
            settings.iot_solution_token.clone(),
            settings.iot_solution_timeout,
        )
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        info!(base_url = %authorizer.base_url(), "Authorization client ready");

        Ok(EdgeState {
            devices: Arc::new(DynamoDeviceStore::new(client.clone(), &settings.devices_table)),
            agents: Arc::new(DynamoAgentStore::new(client.clone(), &settings.agents_table)),
            params: Arc::new(DynamoParamStore::new(client.clone(), &settings.params_table)),
            allow_list: Arc::new(DynamoAllowListStore::new(
                client,
                &settings.ble_allow_list_table,
            )),
            authorizer: Arc::new(authorizer),
            clock: Arc::new(SystemClock::new()),
            server_secret: settings.server_secret,
            cors_allowed_origin: settings.cors_allowed_origin,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
