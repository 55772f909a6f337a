//! # Powerline Modem Engine
//!
//! Transport, frame reader and session for an Insteon PLM on a serial link.

pub mod frame;
pub mod monitor;
pub mod serial_mock;
pub mod session;
pub mod transport;

pub use frame::{decode_payload, DecodedFrame, FrameReader, ReadOutcome};
pub use monitor::{Endpoint, MonitorEvent, MonitorSummary};
pub use session::{CommandReply, ModemIdentity, PlmSession, SessionState};
pub use transport::{
    discover_candidates, discover_plm_candidates, list_ports, NativePortOpener, PortInfo,
    PortOpener, SerialConfig, SerialPort, Transport,
};
