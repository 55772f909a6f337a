//! # plm-rs - A Rust Crate for Insteon Powerline Modem Communication
//!
//! The plm-rs crate talks to an Insteon PowerLinc Modem (PLM) over its serial
//! interface. The modem bridges a host to the Insteon powerline/RF network;
//! the host sends 0x6x commands and receives replies plus 0x5x messages
//! relayed from other devices.
//!
//! ## Features
//!
//! - Table-driven command catalog: send templates, reply frame lengths and
//!   field patterns, protocol parameters, all loaded from JSON
//! - Frame reader with bounded resync on the sentinel byte
//! - Session with connect (port probing with `GET_VERSION`), command/reply
//!   correlation and a cancellable monitor loop
//! - Device directory resolving 3-byte addresses to names and rooms
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! plm-rs = "0.1.0"
//! ```
//!
//! ```rust,no_run
//! use plm_rs::{PlmConfig, PlmSession};
//!
//! # async fn run() -> Result<(), plm_rs::PlmError> {
//! let config = PlmConfig::builtin()?;
//! let mut session = PlmSession::new(config);
//! let identity = session.connect(&["/dev/ttyUSB0".to_string()]).await?;
//! println!("{identity}");
//!
//! let reply = session.send_command("LED_ON", &[]).await?;
//! assert!(reply.is_success());
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod logging;
pub mod plm;
pub mod util;

pub use crate::error::PlmError;
pub use crate::logging::{init_logger, log_info};

pub use catalog::{Catalog, FieldValue, FrameDef, FrameFields, FramePattern, ProtocolParams, SendCommandDef};
pub use config::PlmConfig;
pub use directory::{DeviceAddress, DeviceDirectory, DeviceRecord};
pub use plm::{
    CommandReply, DecodedFrame, FrameReader, ModemIdentity, MonitorEvent, MonitorSummary,
    PlmSession, ReadOutcome, SessionState,
};

use crate::plm::transport::PortOpener;
use std::future::Future;

/// Connect to the modem, probing each candidate port in order.
///
/// # Arguments
/// * `config` - Catalog and device directory for the session
/// * `candidates` - Serial port paths (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
///
/// # Returns
/// * `Ok(PlmSession)` - Session bound to the port that answered
/// * `Err(PlmError)` - No candidate held a modem
pub async fn connect(config: PlmConfig, candidates: &[String]) -> Result<PlmSession, PlmError> {
    let mut session = PlmSession::new(config);
    session.connect(candidates).await?;
    Ok(session)
}

/// Disconnect from the modem.
///
/// # Arguments
/// * `session` - Session to close
pub async fn disconnect<O: PortOpener>(session: &mut PlmSession<O>) {
    session.disconnect().await
}

/// Send a named command and return its decoded reply fields.
///
/// # Arguments
/// * `session` - Connected session
/// * `name` - Command name from the catalog, case-insensitive
/// * `args` - Argument bytes appended to the command template
///
/// # Returns
/// * `Ok(FrameFields)` - The modem acknowledged the command
/// * `Err(PlmError)` - Local validation, I/O, or `AckFailure` when rejected
pub async fn send_command<O: PortOpener>(
    session: &mut PlmSession<O>,
    name: &str,
    args: &[u8],
) -> Result<FrameFields, PlmError> {
    session.send_command(name, args).await?.into_result()
}

/// Print every frame the modem reports until `cancel` completes.
///
/// # Arguments
/// * `session` - Connected session
/// * `filter` - Only report frames with this command byte
/// * `cancel` - Future that stops the loop when it completes
///
/// # Returns
/// * `Ok(MonitorSummary)` - Cancelled cleanly
/// * `Err(PlmError)` - Unrecognized frame, I/O failure or invalid filter
pub async fn monitor<O: PortOpener>(
    session: &mut PlmSession<O>,
    filter: Option<u8>,
    cancel: impl Future<Output = ()>,
) -> Result<MonitorSummary, PlmError> {
    session
        .monitor(filter, cancel, |event| println!("{event}"))
        .await
}
