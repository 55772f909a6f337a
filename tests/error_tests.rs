//! Unit tests for the `PlmError` enum and its associated `Display` trait implementation.

use plm_rs::error::PlmError;
use plm_rs::util::hex::HexError;

/// Tests that the `SerialPortError` variant is correctly formatted.
#[test]
fn test_serial_port_error() {
    let err = PlmError::SerialPortError("Test error".to_string());
    assert_eq!(err.to_string(), "Serial port error: Test error");
}

/// Tests that the `WriteError` variant carries the command and byte counts.
#[test]
fn test_write_error() {
    let err = PlmError::WriteError {
        command: "LED_ON".to_string(),
        written: 1,
        expected: 2,
    };
    assert_eq!(err.to_string(), "Failure to send command LED_ON: wrote 1 of 2 byte(s)");
}

/// Tests that frame bytes are rendered as hex.
#[test]
fn test_unrecognized_frame_error() {
    let err = PlmError::UnrecognizedFrame(0xAB);
    assert_eq!(err.to_string(), "Did not recognize the command 0xAB received");
    let err = PlmError::InvalidFilter(0x07);
    assert_eq!(
        err.to_string(),
        "Not a valid command on which to filter received messages: 0x07"
    );
}

#[test]
fn test_unknown_command_error() {
    let err = PlmError::UnknownCommand("NOPE".to_string());
    assert_eq!(err.to_string(), "Command not recognized: \"NOPE\"");
}

#[test]
fn test_frame_timeout_error() {
    let err = PlmError::FrameTimeout { discarded: 3 };
    assert_eq!(err.to_string(), "Timed out waiting for a frame (3 byte(s) discarded)");
}

#[test]
fn test_is_io_classification() {
    assert!(PlmError::ReadError("x".into()).is_io());
    assert!(PlmError::SerialPortError("x".into()).is_io());
    assert!(!PlmError::FrameTimeout { discarded: 0 }.is_io());
    assert!(!PlmError::UnrecognizedFrame(0x99).is_io());
    assert!(!PlmError::NotConnected.is_io());
    assert!(!PlmError::AckFailure {
        command: "LED_ON".into(),
        ack: "0x15".into()
    }
    .is_io());
}

#[test]
fn test_hex_error_converts_to_config_error() {
    let err: PlmError = HexError::OddLength(3).into();
    assert!(matches!(err, PlmError::ConfigError(_)));
}
