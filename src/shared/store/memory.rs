//! In-memory store implementations with the same atomicity guarantees as the
//! DynamoDB ones; each operation runs under a single lock.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{AgentStore, AllowListStore, DeviceStore, PairingCodeStore, ParamStore, UserTokenStore};
use crate::domain::{Agent, AllowListEntry, Device, PairingCode, SystemParam, UserToken};
use crate::error::StoreError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Devices keyed by device code
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    devices: Mutex<HashMap<String, Device>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.devices).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get_by_code(&self, device_code: &str) -> Result<Option<Device>, StoreError> {
        Ok(lock(&self.devices).get(device_code).cloned())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Device>, StoreError> {
        Ok(lock(&self.devices).values().find(|d| d.id == id).cloned())
    }

    async fn create(&self, device: &Device) -> Result<bool, StoreError> {
        let mut devices = lock(&self.devices);
        if devices.contains_key(&device.device_code) {
            return Ok(false);
        }
        devices.insert(device.device_code.clone(), device.clone());
        Ok(true)
    }

    async fn put(&self, device: &Device) -> Result<(), StoreError> {
        lock(&self.devices).insert(device.device_code.clone(), device.clone());
        Ok(())
    }

    async fn list_by_user_agent(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Vec<Device>, StoreError> {
        Ok(lock(&self.devices)
            .values()
            .filter(|d| d.user_id == user_id && d.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn delete_owned(&self, device_code: &str, user_id: &str) -> Result<bool, StoreError> {
        let mut devices = lock(&self.devices);
        match devices.get(device_code) {
            Some(device) if device.user_id == user_id => {
                devices.remove(device_code);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_connected(
        &self,
        device_code: &str,
        timestamp: &str,
    ) -> Result<(), StoreError> {
        if let Some(device) = lock(&self.devices).get_mut(device_code) {
            device.last_connected_at = Some(timestamp.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPairingCodeStore {
    codes: Mutex<HashMap<String, PairingCode>>,
}

impl MemoryPairingCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.codes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PairingCodeStore for MemoryPairingCodeStore {
    async fn claim(&self, code: &PairingCode, now_epoch_seconds: i64) -> Result<bool, StoreError> {
        let mut codes = lock(&self.codes);
        if let Some(existing) = codes.get(&code.code) {
            if existing.is_live(now_epoch_seconds) {
                return Ok(false);
            }
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(true)
    }

    async fn get(&self, code: &str) -> Result<Option<PairingCode>, StoreError> {
        Ok(lock(&self.codes).get(code).cloned())
    }

    async fn delete_for_mac(&self, code: &str, mac_address: &str) -> Result<(), StoreError> {
        let mut codes = lock(&self.codes);
        if codes
            .get(code)
            .map(|existing| existing.mac_address == mac_address)
            .unwrap_or(false)
        {
            codes.remove(code);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAgentStore {
    agents: Mutex<HashMap<String, Agent>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agent: Agent) {
        lock(&self.agents).insert(agent.agent_id.clone(), agent);
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn get(&self, agent_id: &str) -> Result<Option<Agent>, StoreError> {
        Ok(lock(&self.agents).get(agent_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserTokenStore {
    tokens: Mutex<HashMap<String, UserToken>>,
}

impl MemoryUserTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: UserToken) {
        lock(&self.tokens).insert(token.token_hash.clone(), token);
    }
}

#[async_trait]
impl UserTokenStore for MemoryUserTokenStore {
    async fn get_by_hash(&self, token_hash: &str) -> Result<Option<UserToken>, StoreError> {
        Ok(lock(&self.tokens).get(token_hash).cloned())
    }

    async fn update_last_used(&self, token_hash: &str, timestamp: &str) -> Result<(), StoreError> {
        if let Some(token) = lock(&self.tokens).get_mut(token_hash) {
            token.last_used_at = Some(timestamp.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAllowListStore {
    entries: Mutex<HashSet<AllowListEntry>>,
}

impl MemoryAllowListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: AllowListEntry) {
        lock(&self.entries).insert(entry);
    }
}

#[async_trait]
impl AllowListStore for MemoryAllowListStore {
    async fn contains(&self, entry: &AllowListEntry) -> Result<bool, StoreError> {
        Ok(lock(&self.entries).contains(entry))
    }
}

#[derive(Debug, Default)]
pub struct MemoryParamStore {
    params: Mutex<Vec<SystemParam>>,
}

impl MemoryParamStore {
    pub fn new(params: Vec<SystemParam>) -> Self {
        Self {
            params: Mutex::new(params),
        }
    }
}

#[async_trait]
impl ParamStore for MemoryParamStore {
    async fn list(&self) -> Result<Vec<SystemParam>, StoreError> {
        Ok(lock(&self.params).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(code: &str, user: &str) -> Device {
        Device {
            id: format!("id-{}", code),
            device_code: code.to_string(),
            mac_address: String::new(),
            user_id: user.to_string(),
            agent_id: "agent-1".to_string(),
            remark: None,
            auto_update: true,
            bound_at: "2024-01-15T10:30:00+00:00".to_string(),
            updated_at: "2024-01-15T10:30:00+00:00".to_string(),
            last_connected_at: None,
        }
    }

    #[tokio::test]
    async fn test_device_create_is_exclusive() {
        let store = MemoryDeviceStore::new();

        assert!(store.create(&device("AABBCCDDEEFF", "u1")).await.unwrap());
        assert!(!store.create(&device("AABBCCDDEEFF", "u2")).await.unwrap());

        let stored = store.get_by_code("AABBCCDDEEFF").await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");
    }

    #[tokio::test]
    async fn test_delete_owned_checks_owner() {
        let store = MemoryDeviceStore::new();
        store.create(&device("AABBCCDDEEFF", "u1")).await.unwrap();

        assert!(!store.delete_owned("AABBCCDDEEFF", "u2").await.unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.delete_owned("AABBCCDDEEFF", "u1").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_pairing_claim_respects_liveness() {
        let store = MemoryPairingCodeStore::new();
        let code = PairingCode {
            code: "123456".to_string(),
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            created_at: 100,
            expires_at: 200,
        };

        assert!(store.claim(&code, 100).await.unwrap());
        assert!(!store.claim(&code, 199).await.unwrap());
        assert!(store.claim(&code, 200).await.unwrap());
    }

    #[tokio::test]
    async fn test_pairing_delete_only_for_matching_mac() {
        let store = MemoryPairingCodeStore::new();
        let code = PairingCode {
            code: "123456".to_string(),
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            created_at: 100,
            expires_at: 200,
        };
        store.claim(&code, 100).await.unwrap();

        store.delete_for_mac("123456", "11:22:33:44:55:66").await.unwrap();
        assert_eq!(store.len(), 1);

        store.delete_for_mac("123456", "AA:BB:CC:DD:EE:FF").await.unwrap();
        assert!(store.is_empty());
    }
}
