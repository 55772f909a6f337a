//! # Logging Utilities
//!
//! Rate limiting and hex dumps for the frame reader and the monitor loop.
//! A modem left in monitor mode for days on a noisy powerline produces a
//! steady trickle of stray bytes and malformed frames; these helpers keep
//! that from flooding the log.
//!
//! ## Usage
//!
//! ```rust
//! use plm_rs::util::logging::{LogThrottle, log_frame_hex};
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("discarded stray bytes before frame start");
//! }
//!
//! log_frame_hex("rx 0x50", &[0x1a, 0x2b, 0x3c]);
//! ```

use std::collections::HashMap;
use std::time::Instant;

/// Throttling structure for rate-limiting log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Messages refused since the last window reset
    suppressed: u32,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count += 1;
        let allowed = self.count <= self.cap;
        if allowed {
            self.suppressed = 0;
        } else {
            self.suppressed += 1;
        }
        allowed
    }

    /// Messages dropped since the last allowed one
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    /// Reset the throttle (start new window immediately)
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
        self.suppressed = 0;
    }
}

/// Independent throttles keyed by message category
#[derive(Debug, Default)]
pub struct ThrottleManager {
    throttles: HashMap<String, LogThrottle>,
}

impl ThrottleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if logging is allowed for a specific category
    pub fn allow(&mut self, category: &str, window_ms: u64, cap: u32) -> bool {
        self.throttles
            .entry(category.to_string())
            .or_insert_with(|| LogThrottle::new(window_ms, cap))
            .allow()
    }
}

/// Log frame data in hex format for debugging
///
/// Output is truncated so a corrupt length never dumps a huge buffer.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let display_data = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(display_data);
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::debug!(target: "plm::frame", "{prefix}: {hex_str}{suffix}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_throttle_basic() {
        let mut throttle = LogThrottle::new(1000, 3);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(throttle.allow());

        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.suppressed(), 2);
    }

    #[test]
    fn test_log_throttle_reset() {
        let mut throttle = LogThrottle::new(1000, 2);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());

        throttle.reset();
        assert_eq!(throttle.suppressed(), 0);
        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());
    }

    #[test]
    fn test_throttle_manager() {
        let mut manager = ThrottleManager::new();

        assert!(manager.allow("resync", 1000, 2));
        assert!(manager.allow("malformed", 1000, 2));
        assert!(manager.allow("resync", 1000, 2));
        assert!(!manager.allow("resync", 1000, 2));
        assert!(manager.allow("malformed", 1000, 2));
    }

    #[test]
    fn test_log_frame_hex_does_not_panic() {
        log_frame_hex("short", &[0x02, 0x60]);
        log_frame_hex("long", &[0xAA; 200]);
    }
}
