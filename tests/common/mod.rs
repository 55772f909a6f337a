//! Shared fixtures for the session and monitor tests.
#![allow(dead_code)]

use plm_rs::catalog::{Catalog, FrameDef};
use plm_rs::constants::{CONFIG_RECEIVE_FRAMES, CONFIG_SEND_COMMANDS};
use plm_rs::plm::serial_mock::{MockPortOpener, MockSerialPort};
use plm_rs::{DeviceDirectory, PlmConfig, PlmSession};
use std::fs;
use std::path::PathBuf;

/// Short timeouts so silent-line cases finish quickly.
const FAST_PARAMS: &str = r#"{ "sentinel": "02", "baud_rate": 19200, "success_code": "06",
  "read_timeout_ms": 20, "reply_timeout_ms": 500, "resync_limit": 256 }"#;

pub const VERSION_REPLY: [u8; 9] = [0x02, 0x60, 0x1A, 0x2B, 0x3C, 0x03, 0x15, 0x9E, 0x06];
pub const VERSION_NAK: [u8; 9] = [0x02, 0x60, 0x1A, 0x2B, 0x3C, 0x03, 0x15, 0x9E, 0x15];

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// The shipped tables with fast timeouts.
pub fn fast_config() -> PlmConfig {
    let dir = config_dir();
    let read = |file: &str| fs::read_to_string(dir.join(file)).unwrap();
    let catalog = Catalog::from_json(
        &read(CONFIG_SEND_COMMANDS),
        &read(CONFIG_RECEIVE_FRAMES),
        FAST_PARAMS,
    )
    .unwrap();
    PlmConfig::new(catalog, DeviceDirectory::load_dir(&dir).unwrap())
}

/// A payload that satisfies `def`'s pattern, with every value-restricted
/// field set to `ack` when allowed, otherwise to its first permitted value.
pub fn payload_for(def: &FrameDef, ack: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(def.len);
    for (i, field) in def.pattern.fields().iter().enumerate() {
        if field.allowed.is_empty() {
            out.extend((0..field.width).map(|j| (i + j) as u8 + 0x10));
        } else if field.allowed.contains(&ack) {
            out.push(ack);
        } else {
            out.push(field.allowed[0]);
        }
    }
    out
}

/// Full wire frame for `def`.
pub fn frame_for(def: &FrameDef, ack: u8) -> Vec<u8> {
    let mut out = vec![0x02, def.command];
    out.extend(payload_for(def, ack));
    out
}

/// Opener with one port that answers `GET_VERSION`, and a session connected to it.
pub async fn connected() -> (MockPortOpener, MockSerialPort, PlmSession<MockPortOpener>) {
    let opener = MockPortOpener::new();
    let port = opener.add_port("/dev/ttyUSB0");
    port.respond_to(&[0x02, 0x60], &VERSION_REPLY);

    let mut session = PlmSession::with_opener(fast_config(), opener.clone());
    session.connect(&["/dev/ttyUSB0".to_string()]).await.unwrap();
    port.clear();
    (opener, port, session)
}
