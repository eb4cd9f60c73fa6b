use tracing::{info, warn};

use crate::domain::PairingCode;
use crate::error::ServiceError;
use crate::id_generator::IdGenerator;
use crate::store::PairingCodeStore;
use crate::time::Clock;

/// Draws allowed before giving up on finding a free code
pub const MAX_PAIRING_CODE_ATTEMPTS: usize = 32;

/// Default lifetime of a pairing code in seconds
pub const DEFAULT_PAIRING_CODE_TTL_SECONDS: i64 = 86_400;

/// Issue a fresh pairing code for `mac_address`
///
/// Draws 6-digit codes and atomically claims the first one that no live
/// entry holds. A collision discards the draw and samples again.
pub async fn issue_pairing_code(
    store: &dyn PairingCodeStore,
    id_generator: &dyn IdGenerator,
    clock: &dyn Clock,
    mac_address: &str,
    ttl_seconds: i64,
) -> Result<PairingCode, ServiceError> {
    for attempt in 1..=MAX_PAIRING_CODE_ATTEMPTS {
        let now = clock.now_epoch_seconds();
        let candidate = PairingCode {
            code: id_generator.pairing_code(),
            mac_address: mac_address.to_string(),
            created_at: now,
            expires_at: now + ttl_seconds,
        };

        if store.claim(&candidate, now).await? {
            info!(
                mac_address = %mac_address,
                attempt = attempt,
                expires_at = candidate.expires_at,
                "Issued pairing code"
            );
            return Ok(candidate);
        }

        warn!(attempt = attempt, "Pairing code collision, drawing again");
    }

    Err(ServiceError::PairingCodeExhausted(MAX_PAIRING_CODE_ATTEMPTS))
}

/// Look up a live pairing code and return the MAC it was issued for
pub async fn resolve_pairing_code(
    store: &dyn PairingCodeStore,
    clock: &dyn Clock,
    code: &str,
) -> Result<String, ServiceError> {
    match store.get(code).await? {
        Some(entry) if entry.is_live(clock.now_epoch_seconds()) => Ok(entry.mac_address),
        _ => Err(ServiceError::ActivationCodeInvalid),
    }
}
