use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Clock trait for abstracting time operations
pub trait Clock: Send + Sync {
    /// Current time as RFC3339 string (device timestamps)
    fn now_rfc3339(&self) -> String;

    /// Current time as epoch seconds (pairing code TTLs)
    fn now_epoch_seconds(&self) -> i64;
}

/// Production implementation of Clock using system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        Utc::now().to_rfc3339()
    }

    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Test implementation of Clock with controllable time
///
/// Clones share the same instant, so a test can hand one copy to the code
/// under test (behind `Arc<dyn Clock>`) and advance time through another.
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Arc::new(Mutex::new(timestamp)),
        }
    }

    pub fn from_rfc3339(timestamp_str: &str) -> Result<Self, chrono::ParseError> {
        let timestamp = DateTime::parse_from_rfc3339(timestamp_str)?.with_timezone(&Utc);
        Ok(Self::new(timestamp))
    }

    /// Out-of-range values clamp to the Unix epoch
    pub fn from_epoch_seconds(seconds: i64) -> Self {
        let timestamp = DateTime::from_timestamp(seconds, 0).unwrap_or_default();
        Self::new(timestamp)
    }

    pub fn advance_seconds(&self, seconds: i64) {
        let mut timestamp = self.lock();
        *timestamp += chrono::Duration::seconds(seconds);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned lock still holds a valid instant
        self.timestamp.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.lock().to_rfc3339()
    }

    fn now_epoch_seconds(&self) -> i64 {
        self.lock().timestamp()
    }
}
