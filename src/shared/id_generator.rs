use rand::Rng;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Number of decimal digits in a pairing code
pub const PAIRING_CODE_DIGITS: usize = 6;

/// Source of device identifiers and pairing-code draws
pub trait IdGenerator: Send + Sync {
    /// New UUID v4, hyphenated lowercase
    fn uuid_v4(&self) -> String;

    /// One uniformly drawn 6-digit code; leading zeros are kept
    fn pairing_code(&self) -> String;
}

/// Production implementation backed by the thread-local RNG
#[derive(Debug, Clone, Default)]
pub struct RandomIdGenerator;

impl RandomIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for RandomIdGenerator {
    fn uuid_v4(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn pairing_code(&self) -> String {
        let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{:06}", value)
    }
}

/// Deterministic implementation for tests
///
/// UUIDs and pairing codes are replayed from their lists in order, wrapping
/// around when exhausted.
#[derive(Debug, Clone)]
pub struct FixedIdGenerator {
    uuids: Vec<String>,
    codes: Vec<String>,
    uuid_index: Arc<Mutex<usize>>,
    code_index: Arc<Mutex<usize>>,
}

impl FixedIdGenerator {
    pub fn new(uuids: Vec<String>, codes: Vec<String>) -> Self {
        Self {
            uuids,
            codes,
            uuid_index: Arc::new(Mutex::new(0)),
            code_index: Arc::new(Mutex::new(0)),
        }
    }

    /// Fixed pairing codes; UUIDs come from a counter-shaped sequence
    pub fn with_codes(codes: &[&str]) -> Self {
        let uuids = (0..16)
            .map(|i| format!("00000000-0000-4000-8000-{:012}", i))
            .collect();
        Self::new(uuids, codes.iter().map(|c| c.to_string()).collect())
    }

    /// Number of pairing codes drawn so far
    pub fn codes_drawn(&self) -> usize {
        *self.code_index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next(list: &[String], index: &Mutex<usize>) -> String {
        let mut index = index.lock().unwrap_or_else(|e| e.into_inner());
        let value = list[*index % list.len()].clone();
        *index += 1;
        value
    }
}

impl IdGenerator for FixedIdGenerator {
    fn uuid_v4(&self) -> String {
        Self::next(&self.uuids, &self.uuid_index)
    }

    fn pairing_code(&self) -> String {
        Self::next(&self.codes, &self.code_index)
    }
}
