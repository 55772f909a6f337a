//! # PLM Error Handling
//!
//! This module defines the PlmError enum, which represents the different error
//! types that can occur while loading the command catalog or talking to a
//! powerline modem.

use crate::util::hex::HexError;
use thiserror::Error;

/// Represents the different error types that can occur in the PLM crate.
#[derive(Debug, Error)]
pub enum PlmError {
    /// A catalog, parameter or device table is missing, empty or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No candidate port answered the self-test with a verified modem.
    #[error("Could not find a PLM on any of {candidates} candidate port(s)")]
    PlmNotFound { candidates: usize },

    /// The session has no open transport.
    #[error("PLM is not connected")]
    NotConnected,

    /// The command name is not in the send catalog. No I/O was performed.
    #[error("Command not recognized: \"{0}\"")]
    UnknownCommand(String),

    /// The argument bytes do not fit the command's declared syntax. No I/O was performed.
    #[error("Command {command} expects {expected} argument byte(s), got {actual}")]
    InvalidArguments {
        command: String,
        expected: usize,
        actual: usize,
    },

    /// The monitor filter byte is not a known inbound frame type.
    #[error("Not a valid command on which to filter received messages: 0x{0:02X}")]
    InvalidFilter(u8),

    /// The transport accepted fewer bytes than requested, or failed outright.
    #[error("Failure to send command {command}: wrote {written} of {expected} byte(s)")]
    WriteError {
        command: String,
        written: usize,
        expected: usize,
    },

    /// The transport failed or returned a short read.
    #[error("Serial read error: {0}")]
    ReadError(String),

    /// No frame start arrived within the read timeout or resync budget.
    #[error("Timed out waiting for a frame ({discarded} byte(s) discarded)")]
    FrameTimeout { discarded: usize },

    /// A frame whose command byte has no catalog entry; its length is unknown.
    #[error("Did not recognize the command 0x{0:02X} received")]
    UnrecognizedFrame(u8),

    /// The modem answered but rejected the command.
    #[error("Command {command} rejected by PLM (ack {ack})")]
    AckFailure { command: String, ack: String },

    /// Serial port could not be opened or enumerated.
    #[error("Serial port error: {0}")]
    SerialPortError(String),
}

impl PlmError {
    /// True for transport-level failures after which the link is considered lost.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            PlmError::WriteError { .. } | PlmError::ReadError(_) | PlmError::SerialPortError(_)
        )
    }
}

impl From<HexError> for PlmError {
    fn from(e: HexError) -> Self {
        PlmError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for PlmError {
    fn from(e: serde_json::Error) -> Self {
        PlmError::ConfigError(e.to_string())
    }
}
