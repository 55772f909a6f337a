//! # Utility Modules
//!
//! Hex encoding/decoding and logging helpers shared across the crate.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, decode_hex_args, encode_hex, encode_hex_upper, format_hex_compact, hex_byte};
pub use logging::{log_frame_hex, LogThrottle, ThrottleManager};
