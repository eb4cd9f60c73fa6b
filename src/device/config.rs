use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;

use voice_device_backend::repo::{
    DynamoAgentStore, DynamoDeviceStore, DynamoPairingCodeStore, DynamoUserTokenStore,
};
use voice_device_backend::shared::binding::Registry;
use voice_device_backend::shared::pairing::DEFAULT_PAIRING_CODE_TTL_SECONDS;
use voice_device_backend::store::{AgentStore, DeviceStore, PairingCodeStore, UserTokenStore};
use voice_device_backend::{Clock, IdGenerator, RandomIdGenerator, SystemClock};

/// Environment settings for the device API
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub devices_table: String,
    pub pairing_codes_table: String,
    pub agents_table: String,
    pub user_tokens_table: String,
    /// Secret prepended to user tokens before hashing
    pub token_pepper: String,
    pub pairing_code_ttl_seconds: i64,
    pub cors_allowed_origin: String,
}

impl Settings {
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

        let pairing_code_ttl_seconds = match lookup("PAIRING_CODE_TTL_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(format!("PAIRING_CODE_TTL_SECONDS={}", raw))
                })?,
            None => DEFAULT_PAIRING_CODE_TTL_SECONDS,
        };

        Ok(Settings {
            devices_table: required("DEVICES_TABLE")?,
            pairing_codes_table: required("PAIRING_CODES_TABLE")?,
            agents_table: required("AGENTS_TABLE")?,
            user_tokens_table: required("USER_TOKENS_TABLE")?,
            token_pepper: required("TOKEN_PEPPER")?,
            pairing_code_ttl_seconds,
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN").unwrap_or_else(|| "*".to_string()),
        })
    }
}

/// Everything a request needs, built once per cold start
pub struct AppState {
    pub devices: Arc<dyn DeviceStore>,
    pub pairing_codes: Arc<dyn PairingCodeStore>,
    pub agents: Arc<dyn AgentStore>,
    pub user_tokens: Arc<dyn UserTokenStore>,
    pub clock: Arc<dyn Clock>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub token_pepper: String,
    pub pairing_code_ttl_seconds: i64,
    pub cors_allowed_origin: String,
}

impl AppState {
    /// Create the state from environment variables and the default AWS config
    pub async fn from_env() -> Result<Self, ConfigError> {
        let settings = Settings::from_lookup(|name| std::env::var(name).ok())?;

        // Load AWS configuration with behavior version
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        // Create DynamoDB client with appropriate timeouts
        let dynamodb_config = aws_sdk_dynamodb::config::Builder::from(&aws_config)
            .timeout_config(
                aws_sdk_dynamodb::config::timeout::TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(25)) // Leave 5s buffer for Lambda timeout
                    .operation_attempt_timeout(Duration::from_secs(10))
                    .build(),
            )
            .build();

        let client = DynamoDbClient::from_conf(dynamodb_config);

        Ok(Self::with_stores(
            &settings,
            Arc::new(DynamoDeviceStore::new(client.clone(), &settings.devices_table)),
            Arc::new(DynamoPairingCodeStore::new(
                client.clone(),
                &settings.pairing_codes_table,
            )),
            Arc::new(DynamoAgentStore::new(client.clone(), &settings.agents_table)),
            Arc::new(DynamoUserTokenStore::new(client, &settings.user_tokens_table)),
            Arc::new(SystemClock::new()),
            Arc::new(RandomIdGenerator::new()),
        ))
    }

    pub fn with_stores(
        settings: &Settings,
        devices: Arc<dyn DeviceStore>,
        pairing_codes: Arc<dyn PairingCodeStore>,
        agents: Arc<dyn AgentStore>,
        user_tokens: Arc<dyn UserTokenStore>,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            devices,
            pairing_codes,
            agents,
            user_tokens,
            clock,
            id_generator,
            token_pepper: settings.token_pepper.clone(),
            pairing_code_ttl_seconds: settings.pairing_code_ttl_seconds,
            cors_allowed_origin: settings.cors_allowed_origin.clone(),
        }
    }

    /// Registry over this state's stores
    pub fn registry(&self) -> Registry<'_> {
        Registry {
            devices: self.devices.as_ref(),
            pairing_codes: self.pairing_codes.as_ref(),
            agents: self.agents.as_ref(),
            clock: self.clock.as_ref(),
            id_generator: self.id_generator.as_ref(),
        }
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
