use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::domain::{ParamValueType, SystemParam};
use crate::error::ServiceError;
use crate::store::{AgentStore, DeviceStore};
use crate::time::Clock;
use crate::validators::{device_code_from_mac, normalize_mac};

/// Model configuration handed to an edge server for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentModels {
    pub device_id: String,
    pub agent_id: String,
    pub prompt: Option<String>,
    /// Module type to the model id the agent currently selects
    pub selected_module: BTreeMap<String, String>,
    /// `{type: {model_id: config}}` for every module the caller is missing
    #[serde(flatten)]
    pub modules: BTreeMap<String, Value>,
}

/// Top-level keys of [`AgentModels`] that a module type may not shadow
const RESERVED_MODULE_TYPES: [&str; 4] = ["device_id", "agent_id", "prompt", "selected_module"];

/// Build the nested server-base config object from dotted parameters
///
/// `server.websocket = ws://...` becomes `{"server": {"websocket": "ws://..."}}`.
/// Parameters apply in `param_code` order, so a later dotted code nested under
/// an earlier scalar replaces that scalar with an object.
pub fn server_base_config(mut params: Vec<SystemParam>) -> Value {
    params.sort_by(|a, b| a.param_code.cmp(&b.param_code));

    let mut root = Map::new();
    for param in &params {
        let path: Vec<&str> = param
            .param_code
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((leaf, parents)) = path.split_last() else {
            warn!(param_code = %param.param_code, "Skipping parameter with empty code");
            continue;
        };

        insert_path(&mut root, parents, leaf, typed_value(param));
    }

    Value::Object(root)
}

fn insert_path(node: &mut Map<String, Value>, parents: &[&str], leaf: &str, value: Value) {
    let Some((head, rest)) = parents.split_first() else {
        node.insert(leaf.to_string(), value);
        return;
    };

    let entry = node
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        insert_path(child, rest, leaf, value);
    }
}

fn typed_value(param: &SystemParam) -> Value {
    let raw = param.param_value.trim();
    let typed = match param.value_type {
        ParamValueType::String => None,
        ParamValueType::Number => raw
            .parse::<i64>()
            .ok()
            .map(Number::from)
            .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
            .map(Value::Number),
        ParamValueType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        ParamValueType::Json => serde_json::from_str(raw).ok(),
    };

    typed.unwrap_or_else(|| {
        if param.value_type != ParamValueType::String {
            warn!(
                param_code = %param.param_code,
                value_type = ?param.value_type,
                "Parameter value does not match its type, using string"
            );
        }
        Value::String(param.param_value.clone())
    })
}

/// Resolve the agent bound to `mac_address` and report the models the caller lacks
pub async fn agent_models(
    devices: &dyn DeviceStore,
    agents: &dyn AgentStore,
    clock: &dyn Clock,
    mac_address: &str,
    selected_module: &BTreeMap<String, String>,
) -> Result<AgentModels, ServiceError> {
    if mac_address.trim().is_empty() {
        return Err(ServiceError::MissingField("macAddress".to_string()));
    }
    let mac = normalize_mac(mac_address).map_err(ServiceError::InvalidMac)?;
    let device_code = device_code_from_mac(&mac);

    let device = devices
        .get_by_code(&device_code)
        .await?
        .ok_or_else(|| ServiceError::DeviceNotBound(mac.clone()))?;

    let agent = agents
        .get(&device.agent_id)
        .await?
        .ok_or(ServiceError::AgentNotFound)?;

    let mut response = AgentModels {
        device_id: device.id.clone(),
        agent_id: agent.agent_id.clone(),
        prompt: agent.system_prompt.clone(),
        selected_module: BTreeMap::new(),
        modules: BTreeMap::new(),
    };

    for (module_type, module) in &agent.modules {
        if RESERVED_MODULE_TYPES.contains(&module_type.as_str()) {
            warn!(agent_id = %agent.agent_id, module_type = %module_type, "Skipping module with reserved type");
            continue;
        }
        response
            .selected_module
            .insert(module_type.clone(), module.model_id.clone());

        if selected_module.get(module_type) != Some(&module.model_id) {
            let mut entry = Map::new();
            entry.insert(module.model_id.clone(), module.config.clone());
            response.modules.insert(module_type.clone(), Value::Object(entry));
        }
    }

    // Connection tracking must not fail the config fetch
    if let Err(e) = devices
        .touch_last_connected(&device.device_code, &clock.now_rfc3339())
        .await
    {
        warn!(device_code = %device.device_code, error = %e, "Failed to record last connection");
    }

    info!(
        device_code = %device.device_code,
        agent_id = %agent.agent_id,
        modules_sent = response.modules.len(),
        "Agent models resolved"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Agent, Device, ModuleConfig};
    use crate::store::memory::{MemoryAgentStore, MemoryDeviceStore};
    use crate::time::FixedClock;
    use serde_json::json;

    fn param(code: &str, value: &str, value_type: ParamValueType) -> SystemParam {
        SystemParam {
            param_code: code.to_string(),
            param_value: value.to_string(),
            value_type,
        }
    }

    #[test]
    fn test_server_base_config_nests_and_types() {
        let config = server_base_config(vec![
            param("server.websocket", "ws://edge:8000", ParamValueType::String),
            param("server.port", "8000", ParamValueType::Number),
            param("server.ratio", "0.5", ParamValueType::Number),
            param("ota.enabled", "TRUE", ParamValueType::Boolean),
            param("plugins", r#"["weather","music"]"#, ParamValueType::Json),
        ]);

        assert_eq!(
            config,
            json!({
                "server": {"websocket": "ws://edge:8000", "port": 8000, "ratio": 0.5},
                "ota": {"enabled": true},
                "plugins": ["weather", "music"],
            })
        );
    }

    #[test]
    fn test_server_base_config_invalid_typed_values_fall_back_to_strings() {
        let config = server_base_config(vec![
            param("server.port", "eight thousand", ParamValueType::Number),
            param("ota.enabled", "maybe", ParamValueType::Boolean),
            param("plugins", "{not json", ParamValueType::Json),
        ]);

        assert_eq!(config["server"]["port"], "eight thousand");
        assert_eq!(config["ota"]["enabled"], "maybe");
        assert_eq!(config["plugins"], "{not json");
    }

    #[test]
    fn test_server_base_config_nested_code_replaces_scalar() {
        let config = server_base_config(vec![
            param("server.mqtt.host", "broker", ParamValueType::String),
            param("server", "legacy", ParamValueType::String),
            param("..", "ignored", ParamValueType::String),
        ]);

        assert_eq!(config, json!({"server": {"mqtt": {"host": "broker"}}}));
    }

    #[test]
    fn test_server_base_config_empty() {
        assert_eq!(server_base_config(Vec::new()), json!({}));
    }

    struct Fixture {
        devices: MemoryDeviceStore,
        agents: MemoryAgentStore,
        clock: FixedClock,
    }

    async fn fixture() -> Fixture {
        let devices = MemoryDeviceStore::new();
        devices
            .create(&Device {
                id: "device-1".to_string(),
                device_code: "AABBCCDDEEFF".to_string(),
                mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
                user_id: "user-1".to_string(),
                agent_id: "agent-1".to_string(),
                remark: None,
                auto_update: true,
                bound_at: "2024-01-15T10:30:00+00:00".to_string(),
                updated_at: "2024-01-15T10:30:00+00:00".to_string(),
                last_connected_at: None,
            })
            .await
            .unwrap();

        let agents = MemoryAgentStore::new();
        let mut modules = BTreeMap::new();
        modules.insert(
            "LLM".to_string(),
            ModuleConfig {
                model_id: "LLM_Qwen".to_string(),
                config: json!({"model": "qwen-turbo"}),
            },
        );
        modules.insert(
            "TTS".to_string(),
            ModuleConfig {
                model_id: "TTS_Edge".to_string(),
                config: json!({"voice": "en-US-AvaNeural"}),
            },
        );
        agents.insert(Agent {
            agent_id: "agent-1".to_string(),
            user_id: "user-1".to_string(),
            agent_name: "Helper".to_string(),
            system_prompt: Some("You are a helpful assistant.".to_string()),
            modules,
        });

        Fixture {
            devices,
            agents,
            clock: FixedClock::from_rfc3339("2024-02-01T08:00:00Z").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_agent_models_sends_only_changed_modules() {
        let fx = fixture().await;
        let mut selected = BTreeMap::new();
        selected.insert("TTS".to_string(), "TTS_Edge".to_string());

        let models = agent_models(&fx.devices, &fx.agents, &fx.clock, "aa-bb-cc-dd-ee-ff", &selected)
            .await
            .unwrap();

        assert_eq!(models.device_id, "device-1");
        assert_eq!(models.prompt.as_deref(), Some("You are a helpful assistant."));
        assert_eq!(models.selected_module.len(), 2);
        assert_eq!(models.modules.len(), 1);
        assert_eq!(models.modules["LLM"]["LLM_Qwen"]["model"], "qwen-turbo");

        let json = serde_json::to_value(&models).unwrap();
        assert_eq!(json["selected_module"]["TTS"], "TTS_Edge");
        assert!(json.get("TTS").is_none());
        assert!(json.get("LLM").is_some());

        let device = fx.devices.get_by_code("AABBCCDDEEFF").await.unwrap().unwrap();
        assert!(device.last_connected_at.unwrap().starts_with("2024-02-01T08:00:00"));
    }

    #[tokio::test]
    async fn test_agent_models_skips_reserved_module_types() {
        let fx = fixture().await;
        let mut agent = fx.agents.get("agent-1").await.unwrap().unwrap();
        agent.modules.insert(
            "prompt".to_string(),
            ModuleConfig {
                model_id: "PROMPT_X".to_string(),
                config: json!({"text": "shadow"}),
            },
        );
        fx.agents.insert(agent);

        let models = agent_models(
            &fx.devices,
            &fx.agents,
            &fx.clock,
            "AA:BB:CC:DD:EE:FF",
            &BTreeMap::new(),
        )
        .await
        .unwrap();

        assert!(!models.modules.contains_key("prompt"));
        assert!(!models.selected_module.contains_key("prompt"));
        let json = serde_json::to_string(&models).unwrap();
        assert_eq!(json.matches("\"prompt\"").count(), 1);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["prompt"], "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn test_agent_models_unknown_device() {
        let fx = fixture().await;

        let result = agent_models(
            &fx.devices,
            &fx.agents,
            &fx.clock,
            "11:22:33:44:55:66",
            &BTreeMap::new(),
        )
        .await;

        assert!(matches!(result, Err(ServiceError::DeviceNotBound(mac)) if mac == "11:22:33:44:55:66"));
    }

    #[tokio::test]
    async fn test_agent_models_rejects_bad_mac() {
        let fx = fixture().await;

        assert!(matches!(
            agent_models(&fx.devices, &fx.agents, &fx.clock, " ", &BTreeMap::new()).await,
            Err(ServiceError::MissingField(_))
        ));
        assert!(matches!(
            agent_models(&fx.devices, &fx.agents, &fx.clock, "zz:zz", &BTreeMap::new()).await,
            Err(ServiceError::InvalidMac(_))
        ));
    }

    #[tokio::test]
    async fn test_agent_models_missing_agent() {
        let fx = fixture().await;
        let empty_agents = MemoryAgentStore::new();

        let result = agent_models(
            &fx.devices,
            &empty_agents,
            &fx.clock,
            "AABBCCDDEEFF",
            &BTreeMap::new(),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::AgentNotFound)));
    }
}
