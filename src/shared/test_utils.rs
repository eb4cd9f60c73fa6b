//! Test utilities for property-based testing
//!
//! Generators for MAC addresses in the forms devices report them, device
//! codes, pairing codes, remarks and upload columns, plus fixture builders
//! for the domain records.

pub mod generators {
    use proptest::prelude::*;

    fn mac_bytes() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 6)
    }

    /// Generate a canonical MAC address (XX:XX:XX:XX:XX:XX, uppercase)
    pub fn mac_address() -> impl Strategy<Value = String> {
        mac_bytes().prop_map(|bytes| {
            bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(":")
        })
    }

    /// Generate a MAC in any accepted spelling, paired with its canonical form
    pub fn loose_mac_address() -> impl Strategy<Value = (String, String)> {
        (mac_bytes(), 0usize..4, any::<bool>()).prop_map(|(bytes, style, lowercase)| {
            let pairs: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            let canonical = pairs.join(":");
            let spelled = match style {
                0 => pairs.join(":"),
                1 => pairs.join("-"),
                2 => pairs.concat(),
                _ => format!("  {} ", pairs.join(":")),
            };
            let spelled = if lowercase {
                spelled.to_lowercase()
            } else {
                spelled
            };
            (spelled, canonical)
        })
    }

    /// Generate a string that is not a MAC address in any accepted spelling
    pub fn invalid_mac_address() -> impl Strategy<Value = String> {
        prop_oneof![
            // Too short
            Just("AA:BB:CC:DD:EE".to_string()),
            // Too long
            Just("AA:BB:CC:DD:EE:FF:00".to_string()),
            // Mixed separators
            Just("AA:BB-CC:DD:EE:FF".to_string()),
            // Invalid characters
            Just("GG:HH:II:JJ:KK:LL".to_string()),
            // Pairing code, not a MAC
            Just("123456".to_string()),
            // Empty
            Just("".to_string()),
        ]
    }

    /// Generate a device code (12 uppercase hex digits)
    pub fn device_code() -> impl Strategy<Value = String> {
        "[0-9A-F]{12}"
    }

    /// Generate a 6-digit pairing code
    pub fn pairing_code() -> impl Strategy<Value = String> {
        (0u32..1_000_000).prop_map(|n| format!("{:06}", n))
    }

    /// Generate a valid remark (may be empty)
    pub fn remark() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 客厅音箱]{0,64}"
    }

    /// Generate a remark that fails validation
    pub fn invalid_remark() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{65,80}",
            "[a-z]{1,10}\n[a-z]{1,10}",
            "[a-z]{1,10}\t",
        ]
    }

    /// Generate the first column of an upload: device codes mixed with blank cells
    pub fn device_code_column(size: std::ops::Range<usize>) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop_oneof![
                4 => device_code(),
                1 => Just(String::new()),
                1 => Just("   ".to_string()),
            ],
            size,
        )
    }
}

pub mod helpers {
    use crate::domain::{Agent, Device, ModuleConfig};
    use std::collections::BTreeMap;

    /// Build a bound device record
    pub fn device(device_code: &str, user_id: &str, agent_id: &str) -> Device {
        let mac = device_code
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect::<Vec<_>>()
            .join(":");

        Device {
            id: format!("id-{}", device_code.to_lowercase()),
            device_code: device_code.to_string(),
            mac_address: mac,
            user_id: user_id.to_string(),
            agent_id: agent_id.to_string(),
            remark: None,
            auto_update: true,
            bound_at: "2024-01-15T10:30:00+00:00".to_string(),
            updated_at: "2024-01-15T10:30:00+00:00".to_string(),
            last_connected_at: None,
        }
    }

    /// Build an agent with the given `(module type, model id)` selections
    pub fn agent(agent_id: &str, user_id: &str, modules: &[(&str, &str)]) -> Agent {
        let modules: BTreeMap<String, ModuleConfig> = modules
            .iter()
            .map(|(module_type, model_id)| {
                (
                    module_type.to_string(),
                    ModuleConfig {
                        model_id: model_id.to_string(),
                        config: serde_json::json!({ "type": module_type.to_lowercase() }),
                    },
                )
            })
            .collect();

        Agent {
            agent_id: agent_id.to_string(),
            user_id: user_id.to_string(),
            agent_name: format!("Agent {}", agent_id),
            system_prompt: Some("You are a helpful assistant.".to_string()),
            modules,
        }
    }

    /// Helper to check if a string is a valid UUID v4
    pub fn is_valid_uuid_v4(s: &str) -> bool {
        uuid::Uuid::parse_str(s)
            .map(|id| id.get_version_num() == 4 && s.len() == 36)
            .unwrap_or(false)
    }

    /// Helper to check if a string is a canonical MAC address
    pub fn is_canonical_mac(s: &str) -> bool {
        if s.len() != 17 {
            return false;
        }

        s.split(':').count() == 6
            && s.split(':').all(|part| {
                part.len() == 2
                    && part
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
    }
}
