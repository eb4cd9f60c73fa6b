use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A piece of hardware bound to a user account and an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    /// MAC-derived code, 12 uppercase hex digits (e.g. "AABBCCDDEEFF")
    pub device_code: String,
    /// Canonical MAC address (XX:XX:XX:XX:XX:XX)
    pub mac_address: String,
    pub user_id: String,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// OTA auto-update flag
    pub auto_update: bool,
    pub bound_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<String>,
}

/// Short-lived code mapping a 6-digit number to a MAC address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingCode {
    pub code: String,
    pub mac_address: String,
    pub created_at: i64,
    /// Epoch seconds; the code is live while `expires_at > now`
    pub expires_at: i64,
}

impl PairingCode {
    pub fn is_live(&self, now_epoch_seconds: i64) -> bool {
        self.expires_at > now_epoch_seconds
    }
}

/// A configured voice-assistant persona owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub user_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Module type (e.g. "LLM", "TTS", "ASR") to the model selected for it
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

/// Model selection and its runtime configuration blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub model_id: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Bearer token record; only the peppered hash is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserToken {
    pub token_hash: String,
    pub user_id: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

/// Bluetooth allow-list entry; presence means the device is pre-authorized
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowListEntry {
    pub ble_name: String,
    pub flag: String,
}

/// System parameter feeding the server-base config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemParam {
    /// Dotted path, e.g. "server.websocket"
    pub param_code: String,
    pub param_value: String,
    #[serde(default)]
    pub value_type: ParamValueType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValueType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_code_liveness() {
        let code = PairingCode {
            code: "012345".to_string(),
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            created_at: 1_700_000_000,
            expires_at: 1_700_000_600,
        };

        assert!(code.is_live(1_700_000_000));
        assert!(code.is_live(1_700_000_599));
        assert!(!code.is_live(1_700_000_600));
        assert!(!code.is_live(1_800_000_000));
    }

    #[test]
    fn test_device_serializes_camel_case() {
        let device = Device {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            device_code: "AABBCCDDEEFF".to_string(),
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            user_id: "user-1".to_string(),
            agent_id: "agent-1".to_string(),
            remark: None,
            auto_update: true,
            bound_at: "2024-01-15T10:30:00+00:00".to_string(),
            updated_at: "2024-01-15T10:30:00+00:00".to_string(),
            last_connected_at: None,
        };

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["deviceCode"], "AABBCCDDEEFF");
        assert_eq!(json["macAddress"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(json["autoUpdate"], true);
        assert!(json.get("remark").is_none());
        assert!(json.get("lastConnectedAt").is_none());
    }

    #[test]
    fn test_agent_deserializes_without_modules() {
        let json = r#"{"agent_id":"a1","user_id":"u1","agent_name":"Helper"}"#;
        let agent: Agent = serde_json::from_str(json).unwrap();

        assert_eq!(agent.agent_id, "a1");
        assert!(agent.modules.is_empty());
        assert!(agent.system_prompt.is_none());
    }

    #[test]
    fn test_param_value_type_defaults_to_string() {
        let json = r#"{"param_code":"server.ip","param_value":"0.0.0.0"}"#;
        let param: SystemParam = serde_json::from_str(json).unwrap();
        assert_eq!(param.value_type, ParamValueType::String);
    }
}
