//! Device AI-entitlement checks.
//!
//! Verdicts come from the external IoT solution service unless the device's
//! Bluetooth name and flag are on the local allow-list.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::domain::AllowListEntry;
use crate::error::ServiceError;
use crate::store::AllowListStore;

/// Path of the entitlement endpoint on the authorization service
pub const HAS_AI_AUTH_PATH: &str = "/authApi/hasAIAuth";

/// Source of a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSource {
    AllowList,
    Upstream,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacAuthRequest {
    #[serde(default)]
    pub mac: String,
    /// Accepted as a JSON string or integer, forwarded as text
    #[serde(default, deserialize_with = "string_or_integer")]
    pub platform: String,
    /// Overrides the configured service token for this call
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub ble_name: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Platform {
        Text(String),
        Integer(i64),
    }

    Ok(match Option::<Platform>::deserialize(deserializer)? {
        Some(Platform::Text(text)) => text,
        Some(Platform::Integer(number)) => number.to_string(),
        None => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacAuthResponse {
    pub mac: String,
    pub platform: String,
    pub authorized: bool,
    pub source: AuthSource,
}

/// Envelope returned by the authorization service
#[derive(Debug, Clone, Deserialize)]
pub struct AuthEnvelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub data: Option<bool>,
    #[serde(default, alias = "msg")]
    pub mesg: Option<String>,
}

/// Remote entitlement lookup
#[async_trait]
pub trait MacAuthorizer: Send + Sync {
    async fn has_ai_auth(
        &self,
        mac: &str,
        platform: &str,
        authorization: Option<&str>,
    ) -> Result<bool, ServiceError>;
}

/// HTTP client for the IoT solution authorization service
pub struct IotSolutionClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl IotSolutionClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Upstream(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MacAuthorizer for IotSolutionClient {
    async fn has_ai_auth(
        &self,
        mac: &str,
        platform: &str,
        authorization: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let url = format!("{}{}", self.base_url, HAS_AI_AUTH_PATH);
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("mac", mac), ("platform", platform)]);

        let token = authorization
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or(self.token.as_deref());
        if let Some(token) = token {
            let token = token.strip_prefix("Bearer ").unwrap_or(token);
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Authorization service rejected request");
            return Err(ServiceError::Upstream(format!("status {}", status)));
        }

        let envelope: AuthEnvelope = response
            .json()
            .await
            .map_err(|e| ServiceError::Upstream(format!("undecodable response: {}", e)))?;

        envelope.data.ok_or_else(|| {
            ServiceError::Upstream(format!(
                "response carried no verdict (code {:?}, message {:?})",
                envelope.code, envelope.mesg
            ))
        })
    }
}

/// Decide whether a device may use AI features
pub async fn check_mac_authorization(
    allow_list: &dyn AllowListStore,
    authorizer: &dyn MacAuthorizer,
    request: &MacAuthRequest,
) -> Result<MacAuthResponse, ServiceError> {
    let mac = request.mac.trim();
    if mac.is_empty() {
        return Err(ServiceError::MissingField("mac".to_string()));
    }
    let platform = request.platform.trim();

    let ble_name = request.ble_name.as_deref().map(str::trim).unwrap_or_default();
    let flag = request.flag.as_deref().map(str::trim).unwrap_or_default();
    if !ble_name.is_empty() && !flag.is_empty() {
        let entry = AllowListEntry {
            ble_name: ble_name.to_string(),
            flag: flag.to_string(),
        };
        if allow_list.contains(&entry).await? {
            info!(mac = %mac, ble_name = %ble_name, "Device authorized by allow-list");
            return Ok(MacAuthResponse {
                mac: mac.to_string(),
                platform: platform.to_string(),
                authorized: true,
                source: AuthSource::AllowList,
            });
        }
    }

    let authorized = authorizer
        .has_ai_auth(mac, platform, request.authorization.as_deref())
        .await?;

    info!(mac = %mac, platform = %platform, authorized = authorized, "Authorization verdict received");
    Ok(MacAuthResponse {
        mac: mac.to_string(),
        platform: platform.to_string(),
        authorized,
        source: AuthSource::Upstream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryAllowListStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers a fixed verdict and records what it was asked
    struct StubAuthorizer {
        verdict: Result<bool, String>,
        calls: AtomicUsize,
        last_authorization: Mutex<Option<String>>,
    }

    impl StubAuthorizer {
        fn answering(verdict: Result<bool, String>) -> Self {
            Self {
                verdict,
                calls: AtomicUsize::new(0),
                last_authorization: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MacAuthorizer for StubAuthorizer {
        async fn has_ai_auth(
            &self,
            _mac: &str,
            _platform: &str,
            authorization: Option<&str>,
        ) -> Result<bool, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_authorization.lock().unwrap() = authorization.map(str::to_string);
            self.verdict.clone().map_err(ServiceError::Upstream)
        }
    }

    fn request(mac: &str) -> MacAuthRequest {
        MacAuthRequest {
            mac: mac.to_string(),
            platform: "esp32".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_platform_accepts_string_or_integer() {
        let numeric: MacAuthRequest =
            serde_json::from_str(r#"{"mac":"AA:BB:CC:DD:EE:FF","platform":1}"#).unwrap();
        let text: MacAuthRequest =
            serde_json::from_str(r#"{"mac":"AA:BB:CC:DD:EE:FF","platform":"esp32"}"#).unwrap();
        let null: MacAuthRequest =
            serde_json::from_str(r#"{"mac":"AA:BB:CC:DD:EE:FF","platform":null}"#).unwrap();

        assert_eq!(numeric.platform, "1");
        assert_eq!(text.platform, "esp32");
        assert_eq!(null.platform, "");
        assert!(serde_json::from_str::<MacAuthRequest>(r#"{"platform":true}"#).is_err());
    }

    #[tokio::test]
    async fn test_upstream_verdict_is_returned_unchanged() {
        let allow_list = MemoryAllowListStore::new();

        for verdict in [true, false] {
            let authorizer = StubAuthorizer::answering(Ok(verdict));
            let response = check_mac_authorization(&allow_list, &authorizer, &request("AA:BB:CC:DD:EE:FF"))
                .await
                .unwrap();

            assert_eq!(response.authorized, verdict);
            assert_eq!(response.source, AuthSource::Upstream);
            assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_allow_list_short_circuits() {
        let allow_list = MemoryAllowListStore::new();
        allow_list.insert(AllowListEntry {
            ble_name: "XZ-BOX".to_string(),
            flag: "factory".to_string(),
        });
        let authorizer = StubAuthorizer::answering(Ok(false));

        let mut req = request("AA:BB:CC:DD:EE:FF");
        req.ble_name = Some("XZ-BOX".to_string());
        req.flag = Some("factory".to_string());
        let response = check_mac_authorization(&allow_list, &authorizer, &req)
            .await
            .unwrap();

        assert!(response.authorized);
        assert_eq!(response.source, AuthSource::AllowList);
        assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);

        req.flag = Some("retail".to_string());
        let response = check_mac_authorization(&allow_list, &authorizer, &req)
            .await
            .unwrap();
        assert!(!response.authorized);
        assert_eq!(response.source, AuthSource::Upstream);
    }

    #[tokio::test]
    async fn test_blank_mac_is_rejected_before_upstream() {
        let allow_list = MemoryAllowListStore::new();
        let authorizer = StubAuthorizer::answering(Ok(true));

        let result = check_mac_authorization(&allow_list, &authorizer, &request("  ")).await;

        assert!(matches!(result, Err(ServiceError::MissingField(field)) if field == "mac"));
        assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_and_passes_authorization() {
        let allow_list = MemoryAllowListStore::new();
        let authorizer = StubAuthorizer::answering(Err("timeout".to_string()));
        let mut req = request("AA:BB:CC:DD:EE:FF");
        req.authorization = Some("caller-token".to_string());

        let result = check_mac_authorization(&allow_list, &authorizer, &req).await;

        assert!(matches!(result, Err(ServiceError::Upstream(_))));
        assert_eq!(
            authorizer.last_authorization.lock().unwrap().as_deref(),
            Some("caller-token")
        );
    }

    #[test]
    fn test_envelope_accepts_msg_alias() {
        let envelope: AuthEnvelope =
            serde_json::from_str(r#"{"code":0,"data":true,"msg":"ok"}"#).unwrap();
        assert_eq!(envelope.data, Some(true));
        assert_eq!(envelope.mesg.as_deref(), Some("ok"));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client =
            IotSolutionClient::new("http://auth.local/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://auth.local");
    }
}
