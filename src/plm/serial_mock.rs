//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test the PLM
//! session without a modem attached, and a mock opener that hands out mock
//! ports by name so connect can be exercised against several candidates.
//!
//! Reads pend (rather than returning end-of-stream) while no data is queued,
//! which lets the per-read timeouts of the transport fire as they would on a
//! silent serial line.

use crate::error::PlmError;
use crate::plm::transport::{PortOpener, SerialConfig, SerialPort};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock serial port that simulates bidirectional communication
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Simulated errors
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    /// Cap on bytes accepted per write call
    max_write: Arc<Mutex<Option<usize>>>,
    /// Replies queued automatically when a matching request is written
    replies: Arc<Mutex<Vec<(Vec<u8>, Vec<u8>)>>>,
    closed: Arc<Mutex<bool>>,
    /// When set, flush never completes
    flush_stalled: Arc<Mutex<bool>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.rx_buffer.lock().unwrap().extend(data);
        if let Some(waker) = self.waker.lock().unwrap().take() {
            waker.wake();
        }
    }

    /// Queue a frame: sentinel `0x02`, command byte, payload.
    pub fn queue_frame(&self, command: u8, payload: &[u8]) {
        let mut frame = vec![0x02, command];
        frame.extend_from_slice(payload);
        self.queue_rx_data(&frame);
    }

    /// When exactly `request` is written, queue `response` for reading.
    /// A later registration for the same request takes precedence.
    pub fn respond_to(&self, request: &[u8], response: &[u8]) {
        self.replies
            .lock()
            .unwrap()
            .push((request.to_vec(), response.to_vec()));
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Bytes still waiting to be read
    pub fn pending_rx(&self) -> usize {
        self.rx_buffer.lock().unwrap().len()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
    }

    /// Set an error to be returned on the next operation
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Accept at most `limit` bytes per write (simulates short writes)
    pub fn set_max_write(&self, limit: Option<usize>) {
        *self.max_write.lock().unwrap() = limit;
    }

    /// Make flush pend forever (simulates a tty that never drains)
    pub fn set_flush_stalled(&self, stalled: bool) {
        *self.flush_stalled.lock().unwrap() = stalled;
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

// Implement AsyncRead for MockSerialPort
impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        if rx.is_empty() {
            *self.waker.lock().unwrap() = Some(cx.waker().clone());
            return Poll::Pending;
        }

        let available = rx.len().min(buf.remaining());
        let data: Vec<u8> = rx.drain(..available).collect();
        buf.put_slice(&data);
        Poll::Ready(Ok(()))
    }
}

// Implement AsyncWrite for MockSerialPort
impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let accepted = match *self.max_write.lock().unwrap() {
            Some(limit) => buf.len().min(limit),
            None => buf.len(),
        };
        self.tx_buffer
            .lock()
            .unwrap()
            .extend_from_slice(&buf[..accepted]);

        let response = self
            .replies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(request, _)| request.as_slice() == &buf[..accepted])
            .map(|(_, response)| response.clone());
        if let Some(response) = response {
            self.queue_rx_data(&response);
        }

        Poll::Ready(Ok(accepted))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if *self.flush_stalled.lock().unwrap() {
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        *self.closed.lock().unwrap() = true;
        Poll::Ready(Ok(()))
    }
}

#[async_trait::async_trait]
impl SerialPort for MockSerialPort {
    async fn close(&mut self) -> Result<(), io::Error> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Hands out registered mock ports by name; unknown names fail to open.
#[derive(Clone, Default)]
pub struct MockPortOpener {
    ports: Arc<Mutex<HashMap<String, MockSerialPort>>>,
    opened: Arc<Mutex<Vec<(String, SerialConfig)>>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port and return a handle that shares its buffers.
    pub fn add_port(&self, name: &str) -> MockSerialPort {
        let port = MockSerialPort::new();
        self.ports
            .lock()
            .unwrap()
            .insert(name.to_string(), port.clone());
        port
    }

    /// Names and settings of every open attempt that succeeded, in order.
    pub fn opened(&self) -> Vec<(String, SerialConfig)> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PortOpener for MockPortOpener {
    type Port = MockSerialPort;

    async fn open(&self, port_name: &str, config: SerialConfig) -> Result<Self::Port, PlmError> {
        let port = self
            .ports
            .lock()
            .unwrap()
            .get(port_name)
            .cloned()
            .ok_or_else(|| PlmError::SerialPortError(format!("{port_name}: no such device")))?;
        *port.closed.lock().unwrap() = false;
        self.opened
            .lock()
            .unwrap()
            .push((port_name.to_string(), config));
        Ok(port)
    }
}
