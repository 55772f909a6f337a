//! # Monitor Loop
//!
//! Passive reading of everything the modem reports: responses to 0x6x
//! commands and the 0x5x messages other devices send on the powerline.
//! Each structurally valid frame becomes a [`MonitorEvent`] with its `from`
//! and `to` addresses resolved against the device directory.
//!
//! The loop ends when:
//! - the cancel future completes (clean stop, `Ok`)
//! - a command byte missing from the catalog arrives (`UnrecognizedFrame`)
//! - the transport fails (the session is disconnected)
//!
//! A silent line is not an error; read timeouts simply start another scan.

use crate::catalog::FrameFields;
use crate::directory::{DeviceAddress, DeviceDirectory};
use crate::error::PlmError;
use crate::plm::frame::{DecodedFrame, ReadOutcome};
use crate::plm::session::{PlmSession, SessionState};
use crate::plm::transport::PortOpener;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: DeviceAddress,
    /// "name in room at location", or "unknown"
    pub label: String,
}

impl Endpoint {
    fn resolve(fields: &FrameFields, name: &str, directory: &DeviceDirectory) -> Option<Self> {
        let address = DeviceAddress::from_slice(fields.get(name)?.as_bytes())?;
        Some(Endpoint {
            address,
            label: directory.resolve(&address),
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.label)
    }
}

/// One reported frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub command: u8,
    pub description: String,
    pub from: Option<Endpoint>,
    pub to: Option<Endpoint>,
    pub fields: FrameFields,
}

impl MonitorEvent {
    pub fn from_frame(frame: DecodedFrame, description: &str, directory: &DeviceDirectory) -> Self {
        MonitorEvent {
            command: frame.command,
            description: description.to_string(),
            from: Endpoint::resolve(&frame.fields, "from", directory),
            to: Endpoint::resolve(&frame.fields, "to", directory),
            fields: frame.fields,
        }
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.description)?;
        if let Some(from) = &self.from {
            write!(f, "\n  from: {from}")?;
        }
        if let Some(to) = &self.to {
            write!(f, "\n  to:   {to}")?;
        }
        match (
            self.fields.get("msg_flags"),
            self.fields.get("cmd1"),
            self.fields.get("cmd2"),
        ) {
            (Some(flags), Some(cmd1), Some(cmd2)) => {
                write!(f, "\n    => message flags: '{flags}' cmds: '{cmd1}', '{cmd2}'")
            }
            _ => {
                let rest: Vec<String> = self
                    .fields
                    .iter()
                    .filter(|(name, _)| *name != "from" && *name != "to")
                    .map(|(name, value)| format!("{name}='{value}'"))
                    .collect();
                if rest.is_empty() {
                    Ok(())
                } else {
                    write!(f, "\n    => {}", rest.join(" "))
                }
            }
        }
    }
}

/// Counters for a finished monitor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Frames handed to the sink
    pub reported: usize,
    /// Valid frames skipped by the filter
    pub filtered: usize,
    /// Frames whose payload did not match their pattern
    pub malformed: usize,
}

impl<O: PortOpener> PlmSession<O> {
    /// Report frames to `sink` until `cancel` completes or the loop fails.
    ///
    /// With a `filter`, only frames carrying that command byte are reported;
    /// the rest are still read and decoded so framing stays aligned.
    pub async fn monitor<C, F>(
        &mut self,
        filter: Option<u8>,
        cancel: C,
        mut sink: F,
    ) -> Result<MonitorSummary, PlmError>
    where
        C: Future<Output = ()>,
        F: FnMut(MonitorEvent),
    {
        let catalog = Arc::clone(&self.config.catalog);
        let directory = Arc::clone(&self.config.directory);
        if let Some(byte) = filter {
            if catalog.frame(byte).is_none() {
                return Err(PlmError::InvalidFilter(byte));
            }
        }
        if self.state != SessionState::Ready {
            return Err(PlmError::NotConnected);
        }

        match filter {
            Some(byte) => log::info!("Monitoring, reporting only 0x{byte:02X} frames"),
            None => log::info!("Monitoring all frames"),
        }

        tokio::pin!(cancel);
        let mut summary = MonitorSummary::default();
        loop {
            let link = self.link.as_mut().ok_or(PlmError::NotConnected)?;
            let outcome = tokio::select! {
                biased;
                _ = &mut cancel => {
                    log::info!(
                        "Monitor cancelled after {} reported frame(s)",
                        summary.reported
                    );
                    return Ok(summary);
                }
                outcome = self.reader.read_frame(link) => outcome,
            };

            match outcome {
                Ok(ReadOutcome::Frame(frame)) if !frame.matched => summary.malformed += 1,
                Ok(ReadOutcome::Frame(frame)) if filter.is_some_and(|b| b != frame.command) => {
                    summary.filtered += 1;
                }
                Ok(ReadOutcome::Frame(frame)) => {
                    let description = catalog
                        .frame(frame.command)
                        .map(|def| def.description.as_str())
                        .unwrap_or_default();
                    sink(MonitorEvent::from_frame(frame, description, &directory));
                    summary.reported += 1;
                }
                Ok(ReadOutcome::Unrecognized(byte)) => {
                    log::error!(
                        "Did not recognize the command 0x{byte:02X} received, stopping monitor"
                    );
                    return Err(PlmError::UnrecognizedFrame(byte));
                }
                Err(PlmError::FrameTimeout { discarded }) => {
                    if discarded > 0 {
                        log::debug!("No frame start in {discarded} byte(s), rescanning");
                    }
                }
                Err(e) => {
                    if e.is_io() {
                        log::error!("Link lost while monitoring: {e}");
                        self.disconnect().await;
                    }
                    return Err(e);
                }
            }
        }
    }
}
