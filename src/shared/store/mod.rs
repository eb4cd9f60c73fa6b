//! Persistence seams.
//!
//! Each trait is implemented against DynamoDB in [`crate::repo`] and in
//! memory in [`memory`]. Operations that must be atomic across concurrent
//! requests (claiming a pairing code, creating a binding) report the lost
//! race as `Ok(false)` instead of an error.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{Agent, AllowListEntry, Device, PairingCode, SystemParam, UserToken};
use crate::error::StoreError;

#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get_by_code(&self, device_code: &str) -> Result<Option<Device>, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Device>, StoreError>;

    /// Create unless the device code is already bound; `false` when it is
    async fn create(&self, device: &Device) -> Result<bool, StoreError>;

    /// Replace an existing record
    async fn put(&self, device: &Device) -> Result<(), StoreError>;

    async fn list_by_user_agent(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Vec<Device>, StoreError>;

    /// Delete only if the device still belongs to `user_id`; `false` otherwise
    async fn delete_owned(&self, device_code: &str, user_id: &str) -> Result<bool, StoreError>;

    async fn touch_last_connected(
        &self,
        device_code: &str,
        timestamp: &str,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PairingCodeStore: Send + Sync {
    /// Store the code unless a live entry already holds it; `false` on collision
    async fn claim(&self, code: &PairingCode, now_epoch_seconds: i64) -> Result<bool, StoreError>;

    async fn get(&self, code: &str) -> Result<Option<PairingCode>, StoreError>;

    /// Remove the code only while it still points at `mac_address`
    async fn delete_for_mac(&self, code: &str, mac_address: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get(&self, agent_id: &str) -> Result<Option<Agent>, StoreError>;
}

#[async_trait]
pub trait UserTokenStore: Send + Sync {
    async fn get_by_hash(&self, token_hash: &str) -> Result<Option<UserToken>, StoreError>;

    async fn update_last_used(&self, token_hash: &str, timestamp: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AllowListStore: Send + Sync {
    async fn contains(&self, entry: &AllowListEntry) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ParamStore: Send + Sync {
    async fn list(&self) -> Result<Vec<SystemParam>, StoreError>;
}
