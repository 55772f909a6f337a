//! # PLM Session
//!
//! [`PlmSession`] owns the configuration, the frame reader and at most one
//! open [`Transport`]. It implements the caller-facing operations:
//!
//! - [`connect`](PlmSession::connect): probe candidate ports with `GET_VERSION`
//! - [`send_command`](PlmSession::send_command): one write, then wait for the
//!   frame that echoes the command byte
//! - [`monitor`](PlmSession::monitor): see [`crate::plm::monitor`]
//! - [`disconnect`](PlmSession::disconnect)
//!
//! Every operation takes `&mut self`, so a session never has a command and a
//! monitor loop (or two commands) reading the same port at once. Sessions that
//! must be shared between tasks go behind a `tokio::sync::Mutex`.
//!
//! ```text
//!  Disconnected --connect--> Connecting --GET_VERSION acked--> Ready
//!       ^                        |                               |
//!       +------ no candidate ----+------ I/O error, disconnect --+
//! ```

use crate::catalog::{Catalog, FrameFields, SendCommandDef};
use crate::config::PlmConfig;
use crate::constants::{PLM_ACK_FIELD, PLM_CMD_GET_VERSION};
use crate::directory::DeviceAddress;
use crate::error::PlmError;
use crate::plm::frame::{DecodedFrame, FrameReader, ReadOutcome};
use crate::plm::transport::{
    discover_plm_candidates, NativePortOpener, PortOpener, SerialConfig, Transport,
};
use crate::util::logging::log_frame_hex;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
}

/// Identity reported by the modem in its `GET_VERSION` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemIdentity {
    pub address: DeviceAddress,
    pub category: u8,
    pub subcategory: u8,
    pub firmware: u8,
}

impl ModemIdentity {
    /// Build from the decoded fields of a `GET_VERSION` reply.
    pub fn from_fields(fields: &FrameFields) -> Option<Self> {
        let byte = |name: &str| fields.get(name).and_then(|v| v.as_u8());
        Some(ModemIdentity {
            address: DeviceAddress::new(byte("id1")?, byte("id2")?, byte("id3")?),
            category: byte("dev_cat")?,
            subcategory: byte("dev_subcat")?,
            firmware: byte("firm_ver")?,
        })
    }
}

impl fmt::Display for ModemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Insteon PLM ID= {}: device category={:02X}, subcategory={:02X}, firmware version={:02X}",
            self.address, self.category, self.subcategory, self.firmware
        )
    }
}

/// Outcome of one command exchange that reached a reply frame.
///
/// A rejected command is still a reply: `success` is false and `fields` is
/// empty. Use [`CommandReply::into_result`] to turn rejection into an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub command: String,
    /// Command byte of the reply frame
    pub reply_byte: u8,
    /// Raw ack byte, `None` if the reply did not match its pattern
    pub ack: Option<u8>,
    pub success: bool,
    pub fields: FrameFields,
}

impl CommandReply {
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_result(self) -> Result<FrameFields, PlmError> {
        if self.success {
            Ok(self.fields)
        } else {
            Err(PlmError::AckFailure {
                command: self.command,
                ack: self
                    .ack
                    .map(|a| format!("0x{a:02X}"))
                    .unwrap_or_else(|| "malformed".to_string()),
            })
        }
    }
}

/// A session with one powerline modem.
pub struct PlmSession<O: PortOpener = NativePortOpener> {
    pub(super) config: PlmConfig,
    opener: O,
    pub(super) reader: FrameReader,
    pub(super) link: Option<Transport<O::Port>>,
    pub(super) state: SessionState,
    identity: Option<ModemIdentity>,
}

impl PlmSession {
    /// Session that opens real serial devices.
    pub fn new(config: PlmConfig) -> Self {
        PlmSession::with_opener(config, NativePortOpener)
    }
}

impl<O: PortOpener> PlmSession<O> {
    pub fn with_opener(config: PlmConfig, opener: O) -> Self {
        let reader = FrameReader::new(Arc::clone(&config.catalog));
        PlmSession {
            config,
            opener,
            reader,
            link: None,
            state: SessionState::Disconnected,
            identity: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Identity of the connected modem.
    pub fn identity(&self) -> Option<&ModemIdentity> {
        self.identity.as_ref()
    }

    /// Identifier of the open port.
    pub fn port_name(&self) -> Option<&str> {
        self.link.as_ref().map(Transport::name)
    }

    pub fn config(&self) -> &PlmConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.config.catalog
    }

    /// Probe `candidates` in order and bind to the first that answers
    /// `GET_VERSION` with the success code.
    ///
    /// An already-connected session is disconnected first.
    pub async fn connect(&mut self, candidates: &[String]) -> Result<ModemIdentity, PlmError> {
        self.disconnect().await;

        let catalog = Arc::clone(&self.config.catalog);
        let probe = catalog.command(PLM_CMD_GET_VERSION).ok_or_else(|| {
            PlmError::ConfigError(format!("catalog has no {PLM_CMD_GET_VERSION} command"))
        })?;
        let params = *catalog.params();

        self.state = SessionState::Connecting;
        for name in candidates {
            log::debug!("Probing {name} at {} baud", params.baud_rate);
            let port = match self.opener.open(name, SerialConfig::from(&params)).await {
                Ok(port) => port,
                Err(e) => {
                    log::warn!("Skipping {name}: {e}");
                    continue;
                }
            };
            self.link = Some(Transport::new(port, name.as_str(), params.read_timeout));

            let identity = match self.exchange(probe, &[]).await {
                Ok(reply) if reply.success => ModemIdentity::from_fields(&reply.fields),
                Ok(reply) => {
                    log::warn!("Skipping {name}: {PLM_CMD_GET_VERSION} not acknowledged (ack {:?})", reply.ack);
                    None
                }
                Err(e) => {
                    log::warn!("Skipping {name}: {e}");
                    None
                }
            };

            match identity {
                Some(identity) => {
                    log::info!("{identity} on {name}");
                    self.identity = Some(identity);
                    self.state = SessionState::Ready;
                    return Ok(identity);
                }
                None => {
                    if let Some(link) = self.link.take() {
                        link.close().await;
                    }
                }
            }
        }

        self.state = SessionState::Disconnected;
        Err(PlmError::PlmNotFound {
            candidates: candidates.len(),
        })
    }

    /// Connect using the ports that carry the modem's USB signature.
    pub async fn connect_discovered(&mut self) -> Result<ModemIdentity, PlmError> {
        let candidates = discover_plm_candidates()?;
        self.connect(&candidates).await
    }

    /// Close the port, if any. Always leaves the session disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            log::info!("Closing {}", link.name());
            link.close().await;
        }
        self.identity = None;
        self.state = SessionState::Disconnected;
    }

    /// Send a named command with raw argument bytes and wait for its reply.
    ///
    /// Name and argument checks happen before any I/O. A transport failure
    /// closes the port and leaves the session disconnected.
    pub async fn send_command(&mut self, name: &str, args: &[u8]) -> Result<CommandReply, PlmError> {
        let catalog = Arc::clone(&self.config.catalog);
        let def = catalog
            .command(name)
            .ok_or_else(|| PlmError::UnknownCommand(name.to_string()))?;
        if args.len() != def.args {
            return Err(PlmError::InvalidArguments {
                command: def.name.clone(),
                expected: def.args,
                actual: args.len(),
            });
        }
        if self.state != SessionState::Ready {
            return Err(PlmError::NotConnected);
        }

        let result = self.exchange(def, args).await;
        if let Err(e) = &result {
            if e.is_io() {
                log::error!("Link lost during {}: {e}", def.name);
                self.disconnect().await;
            }
        }
        result
    }

    /// One write, then frames until the reply to `def` arrives.
    async fn exchange(&mut self, def: &SendCommandDef, args: &[u8]) -> Result<CommandReply, PlmError> {
        let link = self.link.as_mut().ok_or(PlmError::NotConnected)?;
        let params = *self.config.catalog.params();
        let expected = def.command_byte();

        let wire = def.compose(args);
        log_frame_hex(&format!("tx {}", def.name), &wire);
        let written = link.write(&wire).await.map_err(|e| {
            log::debug!("{}: write failed: {e}", link.name());
            PlmError::WriteError {
                command: def.name.clone(),
                written: 0,
                expected: wire.len(),
            }
        })?;
        if written < wire.len() {
            return Err(PlmError::WriteError {
                command: def.name.clone(),
                written,
                expected: wire.len(),
            });
        }

        let deadline = Instant::now() + params.reply_timeout;
        loop {
            if Instant::now() >= deadline {
                return Err(PlmError::FrameTimeout { discarded: 0 });
            }
            match self.reader.read_frame(link).await? {
                ReadOutcome::Unrecognized(byte) => return Err(PlmError::UnrecognizedFrame(byte)),
                ReadOutcome::Frame(frame) if frame.command == expected => {
                    return Ok(reply_from_frame(def, frame, params.success_code));
                }
                ReadOutcome::Frame(frame) => {
                    log::debug!(
                        "Waiting for 0x{expected:02X}, passing over 0x{:02X}",
                        frame.command
                    );
                }
            }
        }
    }
}

fn reply_from_frame(def: &SendCommandDef, frame: DecodedFrame, success_code: u8) -> CommandReply {
    let ack = frame.fields.get(PLM_ACK_FIELD).and_then(|v| v.as_u8());
    let success = frame.matched && ack == Some(success_code);
    if !success {
        log::debug!("{} rejected: ack {ack:?}", def.name);
    }
    CommandReply {
        command: def.name.clone(),
        reply_byte: frame.command,
        ack,
        success,
        fields: if success { frame.fields } else { FrameFields::new() },
    }
}
