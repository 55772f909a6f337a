//! # PLM Frame Reader
//!
//! The serial stream from the modem has no length prefix. Frames are found by
//! scanning for the sentinel byte, reading the command byte that follows, and
//! looking that byte up in the catalog to learn how many payload bytes come
//! next. The payload is then matched against the frame's field pattern.
//!
//! ```text
//!  .. noise ..  | 02 | 50 | 1a 2b 3c 44 55 66 0b 11 ff |
//!               sentinel cmd  payload (len from catalog)
//! ```
//!
//! The scan is bounded: each read waits at most the configured read timeout,
//! and at most `resync_limit` stray bytes are skipped, before the reader gives
//! up with [`PlmError::FrameTimeout`].

use crate::catalog::{Catalog, FrameDef, FrameFields};
use crate::error::PlmError;
use crate::plm::transport::{SerialPort, Transport};
use crate::util::logging::{log_frame_hex, ThrottleManager};
use std::sync::Arc;

/// A frame read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub command: u8,
    /// Empty when the payload did not match the pattern
    pub fields: FrameFields,
    /// Whether the payload matched the frame's pattern
    pub matched: bool,
}

/// Result of one read: a catalogued frame, or a command byte the catalog
/// does not know (whose length, and so the rest of the stream, is unknown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(DecodedFrame),
    Unrecognized(u8),
}

/// Match a payload against its frame definition.
pub fn decode_payload(def: &FrameDef, payload: &[u8]) -> DecodedFrame {
    match def.pattern.decode(payload) {
        Some(fields) => DecodedFrame {
            command: def.command,
            fields,
            matched: true,
        },
        None => DecodedFrame {
            command: def.command,
            fields: FrameFields::new(),
            matched: false,
        },
    }
}

/// Turns the transport's byte stream into frames.
pub struct FrameReader {
    catalog: Arc<Catalog>,
    throttles: ThrottleManager,
}

impl FrameReader {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        FrameReader {
            catalog,
            throttles: ThrottleManager::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Read the next frame. Consumes bytes from the transport and nothing else.
    pub async fn read_frame<P: SerialPort>(
        &mut self,
        transport: &mut Transport<P>,
    ) -> Result<ReadOutcome, PlmError> {
        let discarded = self.sync(transport).await?;
        if discarded > 0 && self.throttles.allow("resync", 10_000, 5) {
            log::warn!(
                "{}: discarded {discarded} byte(s) before frame start",
                transport.name()
            );
        }

        let command = transport.read_byte().await?.ok_or_else(|| {
            PlmError::ReadError(format!(
                "{}: short read, no command byte after sentinel",
                transport.name()
            ))
        })?;

        let Some(def) = self.catalog.frame(command) else {
            log::debug!("Unrecognized frame type 0x{command:02X}");
            return Ok(ReadOutcome::Unrecognized(command));
        };

        let payload = transport.read_exact(def.len).await?;
        log_frame_hex(&format!("rx 0x{command:02X}"), &payload);

        let frame = decode_payload(def, &payload);
        if !frame.matched && self.throttles.allow("malformed", 10_000, 5) {
            log::warn!(
                "Malformed 0x{command:02X} frame: {} does not match \"{}\"",
                crate::util::hex::format_hex_compact(&payload),
                def.pattern.source()
            );
        }
        Ok(ReadOutcome::Frame(frame))
    }

    /// Skip to just past the next sentinel; returns the number of bytes skipped.
    async fn sync<P: SerialPort>(&self, transport: &mut Transport<P>) -> Result<usize, PlmError> {
        let params = self.catalog.params();
        let mut discarded = 0usize;
        loop {
            match transport.read_byte().await? {
                Some(b) if b == params.sentinel => return Ok(discarded),
                Some(_) => {
                    discarded += 1;
                    if discarded > params.resync_limit {
                        return Err(PlmError::FrameTimeout { discarded });
                    }
                }
                None => return Err(PlmError::FrameTimeout { discarded }),
            }
        }
    }
}
