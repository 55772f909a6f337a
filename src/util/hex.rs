//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers shared by the catalog loader, the frame reader and the CLI.
//! Catalog templates, parameter bytes and command arguments are all written
//! as hex strings; decoded frame fields are rendered back as hex.
//!
//! ## Usage
//!
//! ```rust
//! use plm_rs::util::hex::{encode_hex, decode_hex, format_hex_compact};
//!
//! let data = [0x02, 0x60];
//! assert_eq!(encode_hex(&data), "0260");
//! assert_eq!(decode_hex("02 60").unwrap(), data);
//! assert_eq!(format_hex_compact(&data), "02 60");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Invalid hex character: {0}")]
    InvalidCharacter(char),

    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Encode bytes to uppercase hex string
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is automatically stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    if let Some(bad) = cleaned.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidCharacter(bad));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Decode an optional argument string; empty input yields no bytes.
pub fn decode_hex_args(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode_hex(hex_str)
}

/// Format hex data for compact display (useful for logs)
///
/// Formats data as "02 50 1a 2b" with spaces between bytes.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a single hex byte string to u8
pub fn hex_byte(hex: &str) -> Result<u8, HexError> {
    let hex = hex.trim();
    if hex.len() != 2 {
        return Err(HexError::OddLength(hex.len()));
    }
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidCharacter(bad));
    }

    u8::from_str_radix(hex, 16).map_err(|e| HexError::DecodeError(e.to_string()))
}
