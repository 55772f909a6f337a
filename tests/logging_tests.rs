//! Unit tests for the logging functionality in the `plm-rs` crate.

use plm_rs::logging::{init_logger, log_debug, log_error, log_info, log_warn};
use plm_rs::util::logging::{log_frame_hex, LogThrottle};

/// Tests that the logging functions work after init.
#[test]
fn test_logging() {
    init_logger();
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
    log_frame_hex("rx 0x50", &[0x1A, 0x2B, 0x3C, 0x44, 0x55, 0x66, 0x0B, 0x11, 0xFF]);
}

/// Tests that the logger can be initialized more than once.
#[test]
fn test_init_logger_twice() {
    init_logger();
    init_logger();
}

#[test]
fn test_throttle_caps_messages() {
    let mut throttle = LogThrottle::new(60_000, 3);
    let allowed = (0..10).filter(|_| throttle.allow()).count();
    assert_eq!(allowed, 3);
    assert_eq!(throttle.suppressed(), 7);
}
