// Declare modules at the root level
pub mod agent_config;
pub mod authorization;
pub mod binding;
pub mod bulk_import;
pub mod domain;
pub mod error;
pub mod id_generator;
pub mod pairing;
pub mod repo;
pub mod store;
pub mod time;
pub mod validators;

// Test utilities module (available in test and integration test builds)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export everything under a shared namespace for external access
pub mod shared {
    pub use super::agent_config;
    pub use super::authorization;
    pub use super::binding;
    pub use super::bulk_import;
    pub use super::domain;
    pub use super::error;
    pub use super::id_generator;
    pub use super::pairing;
    pub use super::repo;
    pub use super::store;
    pub use super::time;
    pub use super::validators;
}

// Also re-export at root for convenience
pub use agent_config::*;
pub use authorization::*;
pub use binding::*;
pub use bulk_import::*;
pub use domain::*;
pub use error::*;
pub use id_generator::*;
pub use pairing::*;
pub use time::*;
pub use validators::*;
