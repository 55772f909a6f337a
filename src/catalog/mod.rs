//! # Command Catalog
//!
//! The catalog holds the three static tables that drive the protocol engine:
//!
//! - send commands: name → wire template, argument policy, help text
//! - receive frames: command byte → payload length, field pattern, description
//! - protocol parameters: sentinel, baud rate, success code, timeouts
//!
//! Tables are loaded once, validated as a whole and never mutated afterwards;
//! a `Catalog` is shared between sessions behind an `Arc`. Loading is
//! all-or-nothing: any empty, missing or malformed table is a
//! [`PlmError::ConfigError`].
//!
//! ## File format
//!
//! ```json
//! // cmds_send.json
//! { "GET_VERSION": { "template": "0260", "args": 0, "syntax": "", "help": "Get IM info" } }
//!
//! // cmds_receive.json
//! { "60": { "len": 7, "pattern": "id1 id2 id3 dev_cat dev_subcat firm_ver ack=06|15",
//!           "description": "Get IM info" } }
//!
//! // im_parms.json
//! { "sentinel": "02", "baud_rate": 19200, "success_code": "06", "read_timeout_ms": 1000 }
//! ```

pub mod pattern;

use crate::constants::{
    CONFIG_PARAMETERS, CONFIG_RECEIVE_FRAMES, CONFIG_SEND_COMMANDS, PLM_ACK_FIELD,
    PLM_DEFAULT_REPLY_TIMEOUT_MS, PLM_DEFAULT_RESYNC_LIMIT,
};
use crate::error::PlmError;
use crate::util::hex::{decode_hex, encode_hex_upper, hex_byte};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub use pattern::{FieldSpec, FieldValue, FrameFields, FramePattern};

const BUILTIN_SEND: &str = include_str!("../../config/cmds_send.json");
const BUILTIN_RECEIVE: &str = include_str!("../../config/cmds_receive.json");
const BUILTIN_PARAMS: &str = include_str!("../../config/im_parms.json");

#[derive(Debug, Deserialize)]
struct RawSendCommand {
    template: String,
    #[serde(default)]
    args: usize,
    #[serde(default)]
    syntax: String,
    #[serde(default)]
    help: String,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    len: usize,
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawParams {
    sentinel: String,
    baud_rate: u32,
    success_code: String,
    read_timeout_ms: u64,
    #[serde(default)]
    reply_timeout_ms: Option<u64>,
    #[serde(default)]
    resync_limit: Option<usize>,
}

/// An outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCommandDef {
    pub name: String,
    /// Fixed prefix bytes: sentinel, command byte, then any fixed data
    pub template: Vec<u8>,
    /// Argument bytes expected after the template
    pub args: usize,
    pub syntax: String,
    pub help: String,
}

impl SendCommandDef {
    /// The command byte the modem echoes in its reply.
    pub fn command_byte(&self) -> u8 {
        self.template[1]
    }

    /// Template rendered as uppercase hex, as shown in listings.
    pub fn template_hex(&self) -> String {
        encode_hex_upper(&self.template)
    }

    /// Wire bytes for this command: template followed verbatim by `args`.
    pub fn compose(&self, args: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.template.len() + args.len());
        buf.put_slice(&self.template);
        buf.put_slice(args);
        buf.freeze()
    }
}

/// An inbound frame type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDef {
    pub command: u8,
    pub len: usize,
    pub pattern: FramePattern,
    pub description: String,
}

/// Named protocol parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolParams {
    pub sentinel: u8,
    pub baud_rate: u32,
    pub success_code: u8,
    pub read_timeout: Duration,
    pub reply_timeout: Duration,
    pub resync_limit: usize,
}

impl ProtocolParams {
    fn from_raw(raw: RawParams) -> Result<Self, PlmError> {
        let sentinel = hex_byte(&raw.sentinel)
            .map_err(|e| PlmError::ConfigError(format!("sentinel: {e}")))?;
        let success_code = hex_byte(&raw.success_code)
            .map_err(|e| PlmError::ConfigError(format!("success_code: {e}")))?;
        if raw.baud_rate == 0 {
            return Err(PlmError::ConfigError("baud_rate must be non-zero".into()));
        }
        if raw.read_timeout_ms == 0 {
            return Err(PlmError::ConfigError("read_timeout_ms must be non-zero".into()));
        }
        if raw.reply_timeout_ms == Some(0) {
            return Err(PlmError::ConfigError("reply_timeout_ms must be non-zero".into()));
        }
        Ok(ProtocolParams {
            sentinel,
            baud_rate: raw.baud_rate,
            success_code,
            read_timeout: Duration::from_millis(raw.read_timeout_ms),
            reply_timeout: Duration::from_millis(
                raw.reply_timeout_ms.unwrap_or(PLM_DEFAULT_REPLY_TIMEOUT_MS),
            ),
            resync_limit: raw.resync_limit.unwrap_or(PLM_DEFAULT_RESYNC_LIMIT),
        })
    }
}

/// The validated command catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    send: BTreeMap<String, SendCommandDef>,
    receive: BTreeMap<u8, FrameDef>,
    params: ProtocolParams,
}

impl Catalog {
    /// Build a catalog from definitions, checking the tables against each other.
    pub fn new(
        commands: Vec<SendCommandDef>,
        frames: Vec<FrameDef>,
        params: ProtocolParams,
    ) -> Result<Self, PlmError> {
        if commands.is_empty() {
            return Err(PlmError::ConfigError("send command table is empty".into()));
        }
        if frames.is_empty() {
            return Err(PlmError::ConfigError("receive frame table is empty".into()));
        }

        let mut receive = BTreeMap::new();
        for frame in frames {
            if frame.pattern.width() != frame.len {
                return Err(PlmError::ConfigError(format!(
                    "frame 0x{:02X}: pattern covers {} byte(s), length is {}",
                    frame.command,
                    frame.pattern.width(),
                    frame.len
                )));
            }
            let command = frame.command;
            if receive.insert(command, frame).is_some() {
                return Err(PlmError::ConfigError(format!(
                    "frame 0x{command:02X} defined twice"
                )));
            }
        }

        let mut send = BTreeMap::new();
        for cmd in commands {
            if cmd.template.len() < 2 || cmd.template[0] != params.sentinel {
                return Err(PlmError::ConfigError(format!(
                    "command {}: template {} must start with sentinel {:02X} and a command byte",
                    cmd.name,
                    cmd.template_hex(),
                    params.sentinel
                )));
            }
            let reply = receive.get(&cmd.command_byte()).ok_or_else(|| {
                PlmError::ConfigError(format!(
                    "command {}: no receive frame for reply 0x{:02X}",
                    cmd.name,
                    cmd.command_byte()
                ))
            })?;
            if !reply.pattern.has_field(PLM_ACK_FIELD) {
                return Err(PlmError::ConfigError(format!(
                    "command {}: reply 0x{:02X} has no {PLM_ACK_FIELD} field",
                    cmd.name,
                    cmd.command_byte()
                )));
            }
            let key = cmd.name.to_uppercase();
            if send.insert(key, cmd).is_some() {
                return Err(PlmError::ConfigError("duplicate command name".into()));
            }
        }

        Ok(Catalog { send, receive, params })
    }

    /// Parse the three tables from their JSON text.
    pub fn from_json(send_json: &str, receive_json: &str, params_json: &str) -> Result<Self, PlmError> {
        let commands = parse_send_table(send_json)?;
        let frames = parse_receive_table(receive_json)?;
        let raw_params: RawParams = serde_json::from_str(params_json)
            .map_err(|e| PlmError::ConfigError(format!("{CONFIG_PARAMETERS}: {e}")))?;
        Catalog::new(commands, frames, ProtocolParams::from_raw(raw_params)?)
    }

    /// Load `cmds_send.json`, `cmds_receive.json` and `im_parms.json` from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, PlmError> {
        let dir = dir.as_ref();
        let send = read_table(dir, CONFIG_SEND_COMMANDS)?;
        let receive = read_table(dir, CONFIG_RECEIVE_FRAMES)?;
        let params = read_table(dir, CONFIG_PARAMETERS)?;
        Catalog::from_json(&send, &receive, &params)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, PlmError> {
        Catalog::from_json(BUILTIN_SEND, BUILTIN_RECEIVE, BUILTIN_PARAMS)
    }

    /// Look up a send command by name, ignoring case.
    pub fn command(&self, name: &str) -> Option<&SendCommandDef> {
        self.send.get(&name.to_uppercase())
    }

    pub fn frame(&self, command: u8) -> Option<&FrameDef> {
        self.receive.get(&command)
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn send_commands(&self) -> impl Iterator<Item = &SendCommandDef> {
        self.send.values()
    }

    pub fn receive_frames(&self) -> impl Iterator<Item = &FrameDef> {
        self.receive.values()
    }
}

pub(crate) fn read_table(dir: &Path, file: &str) -> Result<String, PlmError> {
    std::fs::read_to_string(dir.join(file))
        .map_err(|e| PlmError::ConfigError(format!("unable to read {file}: {e}")))
}

fn parse_send_table(json: &str) -> Result<Vec<SendCommandDef>, PlmError> {
    let raw: BTreeMap<String, RawSendCommand> = serde_json::from_str(json)
        .map_err(|e| PlmError::ConfigError(format!("{CONFIG_SEND_COMMANDS}: {e}")))?;
    raw.into_iter()
        .map(|(name, r)| {
            let template = decode_hex(&r.template).map_err(|e| {
                PlmError::ConfigError(format!("command {name}: template {}: {e}", r.template))
            })?;
            Ok(SendCommandDef {
                name,
                template,
                args: r.args,
                syntax: r.syntax,
                help: r.help,
            })
        })
        .collect()
}

fn parse_receive_table(json: &str) -> Result<Vec<FrameDef>, PlmError> {
    let raw: BTreeMap<String, RawFrame> = serde_json::from_str(json)
        .map_err(|e| PlmError::ConfigError(format!("{CONFIG_RECEIVE_FRAMES}: {e}")))?;
    raw.into_iter()
        .map(|(key, r)| {
            let command = hex_byte(&key)
                .map_err(|e| PlmError::ConfigError(format!("frame key \"{key}\": {e}")))?;
            let pattern = FramePattern::compile(&r.pattern, r.len)?;
            Ok(FrameDef {
                command,
                len: r.len,
                pattern,
                description: r.description,
            })
        })
        .collect()
}
