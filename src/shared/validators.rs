use regex::Regex;
use std::sync::OnceLock;

use crate::id_generator::PAIRING_CODE_DIGITS;

/// Maximum remark length in characters
pub const MAX_REMARK_CHARS: usize = 64;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Validation error for field '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

/// Validate canonical MAC address format (XX:XX:XX:XX:XX:XX with uppercase hex)
pub fn validate_mac_address(mac: &str) -> Result<(), ValidationError> {
    static MAC_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = MAC_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9A-F]{2}(:[0-9A-F]{2}){5}$").expect("MAC regex is valid")
    });

    if regex.is_match(mac) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "mac_address",
            "MAC address must be in format XX:XX:XX:XX:XX:XX with uppercase hexadecimal",
        ))
    }
}

/// Normalize a MAC address to canonical form
///
/// Accepts twelve hex digits in any case, either bare or grouped in pairs
/// by `:` or `-` (one separator style per address).
pub fn normalize_mac(input: &str) -> Result<String, ValidationError> {
    static LOOSE_MAC_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = LOOSE_MAC_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?i)(?:[0-9a-f]{2}(?::[0-9a-f]{2}){5}|[0-9a-f]{2}(?:-[0-9a-f]{2}){5}|[0-9a-f]{12})$",
        )
        .expect("MAC regex is valid")
    });

    let trimmed = input.trim();
    if !regex.is_match(trimmed) {
        return Err(ValidationError::new(
            "mac_address",
            format!("'{}' is not a MAC address", trimmed),
        ));
    }

    let hex: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let canonical = hex
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":");

    validate_mac_address(&canonical)?;
    Ok(canonical)
}

/// Derive the device code (12 uppercase hex digits) from a canonical MAC
pub fn device_code_from_mac(mac: &str) -> String {
    mac.chars().filter(|c| *c != ':').collect()
}

/// Parse a device code into the canonical MAC it was derived from
pub fn parse_device_code(input: &str) -> Result<String, ValidationError> {
    normalize_mac(input).map_err(|_| {
        ValidationError::new(
            "device_code",
            format!("'{}' is not a MAC-derived device code", input.trim()),
        )
    })
}

/// True when the input is exactly a 6-digit pairing code
pub fn is_pairing_code(input: &str) -> bool {
    input.len() == PAIRING_CODE_DIGITS && input.chars().all(|c| c.is_ascii_digit())
}

/// Validate a device remark
/// Empty is allowed (clears the remark); max 64 characters, no control characters
pub fn validate_remark(remark: &str) -> Result<(), ValidationError> {
    let length = remark.chars().count();
    if length > MAX_REMARK_CHARS {
        return Err(ValidationError::new(
            "remark",
            format!(
                "Remark length {} exceeds maximum of {} characters",
                length, MAX_REMARK_CHARS
            ),
        ));
    }

    if remark.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "remark",
            "Remark must not contain control characters",
        ));
    }

    Ok(())
}
