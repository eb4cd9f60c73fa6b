use tracing::{info, warn};

use crate::domain::Device;
use crate::error::ServiceError;
use crate::id_generator::IdGenerator;
use crate::pairing::resolve_pairing_code;
use crate::store::{AgentStore, DeviceStore, PairingCodeStore};
use crate::time::Clock;
use crate::validators::{device_code_from_mac, is_pairing_code, parse_device_code, validate_remark};

/// Device registry operations over the stores of one request
pub struct Registry<'a> {
    pub devices: &'a dyn DeviceStore,
    pub pairing_codes: &'a dyn PairingCodeStore,
    pub agents: &'a dyn AgentStore,
    pub clock: &'a dyn Clock,
    pub id_generator: &'a dyn IdGenerator,
}

impl<'a> Registry<'a> {
    /// Bind a device to `agent_id` on behalf of `user_id`
    ///
    /// `code` is either a live 6-digit pairing code or a MAC-derived device
    /// code. A pairing code is consumed once the binding exists.
    pub async fn bind_device(
        &self,
        user_id: &str,
        agent_id: &str,
        code: &str,
        remark: &str,
    ) -> Result<Device, ServiceError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ServiceError::MissingField("deviceCode".to_string()));
        }

        let (mac_address, pairing_code) = if is_pairing_code(code) {
            let mac = resolve_pairing_code(self.pairing_codes, self.clock, code).await?;
            (mac, Some(code))
        } else {
            let mac = parse_device_code(code)
                .map_err(|_| ServiceError::InvalidDeviceCode(code.to_string()))?;
            (mac, None)
        };

        self.require_owned_agent(user_id, agent_id).await?;

        validate_remark(remark).map_err(|e| ServiceError::InvalidValue(e.message))?;

        let now = self.clock.now_rfc3339();
        let device = Device {
            id: self.id_generator.uuid_v4(),
            device_code: device_code_from_mac(&mac_address),
            mac_address,
            user_id: user_id.to_string(),
            agent_id: agent_id.to_string(),
            remark: non_empty(remark),
            auto_update: true,
            bound_at: now.clone(),
            updated_at: now,
            last_connected_at: None,
        };

        if !self.devices.create(&device).await? {
            return Err(ServiceError::DeviceAlreadyBound(device.device_code));
        }

        info!(
            user_id = %user_id,
            agent_id = %agent_id,
            device_code = %device.device_code,
            device_id = %device.id,
            via_pairing_code = pairing_code.is_some(),
            "Device bound"
        );

        if let Some(pairing_code) = pairing_code {
            // The code expires on its own if this fails
            if let Err(e) = self
                .pairing_codes
                .delete_for_mac(pairing_code, &device.mac_address)
                .await
            {
                warn!(error = %e, "Failed to consume pairing code");
            }
        }

        Ok(device)
    }

    /// Replace the remark of one of the user's devices; empty clears it
    pub async fn update_remark(
        &self,
        user_id: &str,
        device_code: &str,
        remark: &str,
    ) -> Result<Device, ServiceError> {
        let mac = parse_device_code(device_code)
            .map_err(|_| ServiceError::InvalidDeviceCode(device_code.trim().to_string()))?;
        validate_remark(remark).map_err(|e| ServiceError::InvalidValue(e.message))?;

        let mut device = self
            .devices
            .get_by_code(&device_code_from_mac(&mac))
            .await?
            .filter(|d| d.user_id == user_id)
            .ok_or(ServiceError::DeviceNotFound)?;

        device.remark = non_empty(remark);
        device.updated_at = self.clock.now_rfc3339();
        self.devices.put(&device).await?;

        info!(device_code = %device.device_code, "Device remark updated");
        Ok(device)
    }

    /// The user's devices bound to `agent_id`, most recently bound first
    pub async fn list_devices(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Vec<Device>, ServiceError> {
        let mut devices = self.devices.list_by_user_agent(user_id, agent_id).await?;
        devices.sort_by(|a, b| b.bound_at.cmp(&a.bound_at));
        Ok(devices)
    }

    /// Remove the user's binding for `device_id`
    ///
    /// Unknown ids and devices owned by someone else are left alone and
    /// reported as `Ok(false)`.
    pub async fn unbind_device(&self, user_id: &str, device_id: &str) -> Result<bool, ServiceError> {
        let Some(device) = self.devices.get_by_id(device_id).await? else {
            info!(device_id = %device_id, "Unbind requested for unknown device");
            return Ok(false);
        };

        let removed = self.devices.delete_owned(&device.device_code, user_id).await?;
        if removed {
            info!(device_id = %device_id, device_code = %device.device_code, "Device unbound");
        } else {
            warn!(device_id = %device_id, user_id = %user_id, "Unbind requested by non-owner");
        }
        Ok(removed)
    }

    /// Switch OTA auto-update on (`1`) or off (`0`)
    pub async fn set_auto_update(
        &self,
        user_id: &str,
        device_id: &str,
        status: i64,
    ) -> Result<Device, ServiceError> {
        let enabled = match status {
            0 => false,
            1 => true,
            other => {
                return Err(ServiceError::InvalidValue(format!(
                    "status must be 0 or 1, got {}",
                    other
                )))
            }
        };

        let mut device = self
            .devices
            .get_by_id(device_id)
            .await?
            .filter(|d| d.user_id == user_id)
            .ok_or(ServiceError::DeviceNotFound)?;

        device.auto_update = enabled;
        device.updated_at = self.clock.now_rfc3339();
        self.devices.put(&device).await?;

        info!(device_id = %device_id, auto_update = enabled, "OTA auto-update changed");
        Ok(device)
    }

    /// `AGENT_NOT_FOUND` unless `agent_id` exists and belongs to `user_id`
    pub async fn require_owned_agent(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<(), ServiceError> {
        match self.agents.get(agent_id).await? {
            Some(agent) if agent.user_id == user_id => Ok(()),
            _ => Err(ServiceError::AgentNotFound),
        }
    }
}

fn non_empty(remark: &str) -> Option<String> {
    let trimmed = remark.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Agent;
    use crate::id_generator::FixedIdGenerator;
    use crate::pairing::issue_pairing_code;
    use crate::store::memory::{MemoryAgentStore, MemoryDeviceStore, MemoryPairingCodeStore};
    use crate::time::FixedClock;

    struct Fixture {
        devices: MemoryDeviceStore,
        pairing_codes: MemoryPairingCodeStore,
        agents: MemoryAgentStore,
        clock: FixedClock,
        ids: FixedIdGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            let agents = MemoryAgentStore::new();
            for (agent_id, user_id) in [("agent-1", "user-1"), ("agent-2", "user-2")] {
                agents.insert(Agent {
                    agent_id: agent_id.to_string(),
                    user_id: user_id.to_string(),
                    agent_name: "Helper".to_string(),
                    system_prompt: None,
                    modules: Default::default(),
                });
            }

            Self {
                devices: MemoryDeviceStore::new(),
                pairing_codes: MemoryPairingCodeStore::new(),
                agents,
                clock: FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap(),
                ids: FixedIdGenerator::with_codes(&["654321"]),
            }
        }

        fn registry(&self) -> Registry<'_> {
            Registry {
                devices: &self.devices,
                pairing_codes: &self.pairing_codes,
                agents: &self.agents,
                clock: &self.clock,
                id_generator: &self.ids,
            }
        }
    }

    #[tokio::test]
    async fn test_bind_with_device_code() {
        let fx = Fixture::new();

        let device = fx
            .registry()
            .bind_device("user-1", "agent-1", "a4cf1205b37e", " kitchen ")
            .await
            .unwrap();

        assert_eq!(device.device_code, "A4CF1205B37E");
        assert_eq!(device.mac_address, "A4:CF:12:05:B3:7E");
        assert_eq!(device.remark.as_deref(), Some("kitchen"));
        assert!(device.auto_update);
        assert_eq!(fx.devices.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_with_pairing_code_consumes_it() {
        let fx = Fixture::new();
        issue_pairing_code(&fx.pairing_codes, &fx.ids, &fx.clock, "11:22:33:44:55:66", 600)
            .await
            .unwrap();

        let device = fx
            .registry()
            .bind_device("user-1", "agent-1", "654321", "")
            .await
            .unwrap();

        assert_eq!(device.device_code, "112233445566");
        assert!(device.remark.is_none());
        assert!(fx.pairing_codes.is_empty());

        let again = fx
            .registry()
            .bind_device("user-1", "agent-1", "654321", "")
            .await;
        assert!(matches!(again, Err(ServiceError::ActivationCodeInvalid)));
    }

    /// Hands out the stored entry, then re-issues the code to another MAC
    struct ReissuedAfterRead {
        inner: MemoryPairingCodeStore,
    }

    #[async_trait::async_trait]
    impl PairingCodeStore for ReissuedAfterRead {
        async fn claim(
            &self,
            code: &crate::domain::PairingCode,
            now_epoch_seconds: i64,
        ) -> Result<bool, crate::error::StoreError> {
            self.inner.claim(code, now_epoch_seconds).await
        }

        async fn get(
            &self,
            code: &str,
        ) -> Result<Option<crate::domain::PairingCode>, crate::error::StoreError> {
            let entry = self.inner.get(code).await?;
            if let Some(original) = &entry {
                let mut reissued = original.clone();
                reissued.mac_address = "66:55:44:33:22:11".to_string();
                reissued.expires_at += 600;
                self.inner.claim(&reissued, original.expires_at).await?;
            }
            Ok(entry)
        }

        async fn delete_for_mac(
            &self,
            code: &str,
            mac_address: &str,
        ) -> Result<(), crate::error::StoreError> {
            self.inner.delete_for_mac(code, mac_address).await
        }
    }

    #[tokio::test]
    async fn test_consume_leaves_code_reissued_to_another_device() {
        let fx = Fixture::new();
        let pairing_codes = ReissuedAfterRead {
            inner: MemoryPairingCodeStore::new(),
        };
        issue_pairing_code(&pairing_codes.inner, &fx.ids, &fx.clock, "11:22:33:44:55:66", 600)
            .await
            .unwrap();
        let registry = Registry {
            pairing_codes: &pairing_codes,
            ..fx.registry()
        };

        let device = registry
            .bind_device("user-1", "agent-1", "654321", "")
            .await
            .unwrap();

        assert_eq!(device.mac_address, "11:22:33:44:55:66");
        let survivor = pairing_codes.inner.get("654321").await.unwrap().unwrap();
        assert_eq!(survivor.mac_address, "66:55:44:33:22:11");
    }

    #[tokio::test]
    async fn test_bind_rejects_foreign_or_missing_agent() {
        let fx = Fixture::new();

        let foreign = fx
            .registry()
            .bind_device("user-1", "agent-2", "AABBCCDDEEFF", "")
            .await;
        let missing = fx
            .registry()
            .bind_device("user-1", "agent-9", "AABBCCDDEEFF", "")
            .await;

        assert!(matches!(foreign, Err(ServiceError::AgentNotFound)));
        assert!(matches!(missing, Err(ServiceError::AgentNotFound)));
        assert!(fx.devices.is_empty());
    }

    #[tokio::test]
    async fn test_bind_twice_is_rejected() {
        let fx = Fixture::new();
        let registry = fx.registry();

        registry
            .bind_device("user-1", "agent-1", "AABBCCDDEEFF", "")
            .await
            .unwrap();
        let second = registry
            .bind_device("user-2", "agent-2", "AA:BB:CC:DD:EE:FF", "")
            .await;

        assert!(matches!(second, Err(ServiceError::DeviceAlreadyBound(code)) if code == "AABBCCDDEEFF"));
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_codes() {
        let fx = Fixture::new();
        let registry = fx.registry();

        assert!(matches!(
            registry.bind_device("user-1", "agent-1", "  ", "").await,
            Err(ServiceError::MissingField(_))
        ));
        assert!(matches!(
            registry.bind_device("user-1", "agent-1", "deviceCode", "").await,
            Err(ServiceError::InvalidDeviceCode(_))
        ));
        assert!(matches!(
            registry.bind_device("user-1", "agent-1", "AABBCCDDEEFF", "bad\nremark").await,
            Err(ServiceError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_update_remark_owner_only() {
        let fx = Fixture::new();
        let registry = fx.registry();
        registry
            .bind_device("user-1", "agent-1", "AABBCCDDEEFF", "old")
            .await
            .unwrap();
        fx.clock.advance_seconds(60);

        let updated = registry
            .update_remark("user-1", "aa:bb:cc:dd:ee:ff", "new")
            .await
            .unwrap();
        assert_eq!(updated.remark.as_deref(), Some("new"));
        assert!(updated.updated_at.starts_with("2024-01-15T10:31:00"));

        let foreign = registry.update_remark("user-2", "AABBCCDDEEFF", "mine").await;
        assert!(matches!(foreign, Err(ServiceError::DeviceNotFound)));
    }

    #[tokio::test]
    async fn test_list_devices_newest_first() {
        let fx = Fixture::new();
        let registry = fx.registry();

        registry
            .bind_device("user-1", "agent-1", "000000000001", "")
            .await
            .unwrap();
        fx.clock.advance_seconds(10);
        registry
            .bind_device("user-1", "agent-1", "000000000002", "")
            .await
            .unwrap();

        let devices = registry.list_devices("user-1", "agent-1").await.unwrap();
        let codes: Vec<_> = devices.iter().map(|d| d.device_code.as_str()).collect();
        assert_eq!(codes, vec!["000000000002", "000000000001"]);

        assert!(registry.list_devices("user-2", "agent-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unbind_removes_and_tolerates_unknown_ids() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let device = registry
            .bind_device("user-1", "agent-1", "AABBCCDDEEFF", "")
            .await
            .unwrap();

        assert!(!registry.unbind_device("user-1", "no-such-device").await.unwrap());
        assert!(!registry.unbind_device("user-2", &device.id).await.unwrap());
        assert_eq!(fx.devices.len(), 1);

        assert!(registry.unbind_device("user-1", &device.id).await.unwrap());
        assert!(fx.devices.is_empty());
        assert!(!registry.unbind_device("user-1", &device.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_auto_update() {
        let fx = Fixture::new();
        let registry = fx.registry();
        let device = registry
            .bind_device("user-1", "agent-1", "AABBCCDDEEFF", "")
            .await
            .unwrap();

        let off = registry.set_auto_update("user-1", &device.id, 0).await.unwrap();
        assert!(!off.auto_update);
        let on = registry.set_auto_update("user-1", &device.id, 1).await.unwrap();
        assert!(on.auto_update);

        assert!(matches!(
            registry.set_auto_update("user-1", &device.id, 2).await,
            Err(ServiceError::InvalidValue(_))
        ));
        assert!(matches!(
            registry.set_auto_update("user-1", "missing", 1).await,
            Err(ServiceError::DeviceNotFound)
        ));
        assert!(matches!(
            registry.set_auto_update("user-2", &device.id, 1).await,
            Err(ServiceError::DeviceNotFound)
        ));
    }
}
