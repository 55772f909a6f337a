//! # PLM Serial Transport
//!
//! This module provides the byte-stream side of the protocol engine: a
//! [`SerialPort`] trait implemented by `tokio_serial::SerialStream` and by the
//! in-memory mock, a [`PortOpener`] that turns a port identifier into an open
//! port, and [`Transport`], which binds one open port to the per-read timeout
//! and exposes the primitive reads and writes the frame reader needs.
//!
//! Port enumeration lives here as well ([`list_ports`], [`discover_candidates`]);
//! the session itself only consumes an ordered candidate list.

use crate::catalog::ProtocolParams;
use crate::constants::{PLM_USB_PID, PLM_USB_VID};
use crate::error::PlmError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;

/// Trait for serial port operations
#[async_trait::async_trait]
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {
    /// Release the port. Dropping the port also closes it.
    async fn close(&mut self) -> Result<(), std::io::Error>;
}

#[async_trait::async_trait]
impl SerialPort for tokio_serial::SerialStream {
    async fn close(&mut self) -> Result<(), std::io::Error> {
        AsyncWriteExt::shutdown(self).await
    }
}

/// Configuration for serial connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
}

impl From<&ProtocolParams> for SerialConfig {
    fn from(params: &ProtocolParams) -> Self {
        SerialConfig {
            baudrate: params.baud_rate,
            timeout: params.read_timeout,
        }
    }
}

/// Opens ports by identifier.
#[async_trait::async_trait]
pub trait PortOpener: Send + Sync {
    type Port: SerialPort + 'static;

    async fn open(&self, port_name: &str, config: SerialConfig) -> Result<Self::Port, PlmError>;
}

/// Opens real serial devices through `tokio_serial`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePortOpener;

#[async_trait::async_trait]
impl PortOpener for NativePortOpener {
    type Port = tokio_serial::SerialStream;

    /// 8 data bits, no parity, one stop bit, no flow control.
    async fn open(&self, port_name: &str, config: SerialConfig) -> Result<Self::Port, PlmError> {
        tokio_serial::new(port_name, config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(config.timeout)
            .open_native_async()
            .map_err(|e| PlmError::SerialPortError(format!("{port_name}: {e}")))
    }
}

/// An open port bound to its identifier and read timeout.
pub struct Transport<P: SerialPort> {
    port: P,
    name: String,
    read_timeout: Duration,
}

impl<P: SerialPort> Transport<P> {
    pub fn new(port: P, name: impl Into<String>, read_timeout: Duration) -> Self {
        Transport {
            port,
            name: name.into(),
            read_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read a single byte; `Ok(None)` when the read timeout elapses first.
    pub async fn read_byte(&mut self) -> Result<Option<u8>, PlmError> {
        let mut byte = [0u8; 1];
        match timeout(self.read_timeout, self.port.read(&mut byte)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(PlmError::ReadError(format!("{}: end of stream", self.name))),
            Ok(Ok(_)) => Ok(Some(byte[0])),
            Ok(Err(e)) => Err(PlmError::ReadError(format!("{}: {e}", self.name))),
        }
    }

    /// Read exactly `len` bytes. Running out of time or data is a short read.
    pub async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, PlmError> {
        let mut buf = vec![0u8; len];
        let mut got = 0;
        while got < len {
            match timeout(self.read_timeout, self.port.read(&mut buf[got..])).await {
                Err(_) | Ok(Ok(0)) => {
                    return Err(PlmError::ReadError(format!(
                        "{}: short read, got {got} of {len} byte(s)",
                        self.name
                    )))
                }
                Ok(Ok(n)) => got += n,
                Ok(Err(e)) => return Err(PlmError::ReadError(format!("{}: {e}", self.name))),
            }
        }
        Ok(buf)
    }

    /// Issue one write and flush. Returns the number of bytes the port accepted.
    ///
    /// A write that does not complete within the timeout counts as zero bytes;
    /// a flush that does not drain within it is a `TimedOut` error.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, std::io::Error> {
        let written = match timeout(self.read_timeout, self.port.write(data)).await {
            Ok(res) => res?,
            Err(_) => 0,
        };
        timeout(self.read_timeout, AsyncWriteExt::flush(&mut self.port))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("{}: flush did not complete", self.name),
                )
            })??;
        Ok(written)
    }

    /// Close the port, logging rather than propagating a failing close.
    pub async fn close(mut self) {
        if let Err(e) = self.port.close().await {
            log::warn!("Error closing {}: {e}", self.name);
        }
    }
}

/// A serial device visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// USB vendor and product ids, for USB-attached ports
    pub usb_id: Option<(u16, u16)>,
    pub description: String,
}

impl PortInfo {
    pub fn matches_usb(&self, vid: u16, pid: u16) -> bool {
        self.usb_id == Some((vid, pid))
    }
}

/// Enumerate serial ports, sorted by name.
pub fn list_ports() -> Result<Vec<PortInfo>, PlmError> {
    let mut ports: Vec<PortInfo> = tokio_serial::available_ports()
        .map_err(|e| PlmError::SerialPortError(e.to_string()))?
        .into_iter()
        .map(|p| match p.port_type {
            tokio_serial::SerialPortType::UsbPort(usb) => PortInfo {
                name: p.port_name,
                usb_id: Some((usb.vid, usb.pid)),
                description: [usb.manufacturer, usb.product]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" "),
            },
            tokio_serial::SerialPortType::PciPort => PortInfo {
                name: p.port_name,
                usb_id: None,
                description: "PCI".to_string(),
            },
            tokio_serial::SerialPortType::BluetoothPort => PortInfo {
                name: p.port_name,
                usb_id: None,
                description: "Bluetooth".to_string(),
            },
            tokio_serial::SerialPortType::Unknown => PortInfo {
                name: p.port_name,
                usb_id: None,
                description: String::new(),
            },
        })
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}

/// Ports carrying the given USB signature, in name order.
pub fn discover_candidates(vid: u16, pid: u16) -> Result<Vec<String>, PlmError> {
    let candidates: Vec<String> = list_ports()?
        .into_iter()
        .filter(|p| p.matches_usb(vid, pid))
        .map(|p| p.name)
        .collect();
    log::debug!("Found {} candidate port(s) for {vid:04x}:{pid:04x}", candidates.len());
    Ok(candidates)
}

/// Ports carrying the modem's FTDI signature.
pub fn discover_plm_candidates() -> Result<Vec<String>, PlmError> {
    discover_candidates(PLM_USB_VID, PLM_USB_PID)
}
