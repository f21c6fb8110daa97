//! Bus transport abstraction.
//!
//! Defines the `Transport` trait a bus backend implements, allowing
//! different implementations (simulated device, scripted mock, real bus).
//! Framing, CRCs and sequencing live above this layer; a transport only
//! moves bytes and honours the execution delay.

use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::constants::{CRC_LEN, STATUS_FRAME_LEN};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Device not responding")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract command/response bus.
///
/// The device executes one command at a time; callers must hold exclusive
/// access for the duration of an exchange.
pub trait Transport: Send + Sync {
    /// Write a complete command frame.
    fn write(&self, frame: &[u8]) -> Result<usize, TransportError>;

    /// Read a response frame of at most `max_len` bytes.
    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Wait out the command execution time before polling for a response.
    fn wait(&self, exec_time: Duration) {
        thread::sleep(exec_time);
    }

    /// Send a frame, wait, and read back the response frame.
    fn send_and_receive(
        &self,
        frame: &[u8],
        exec_time: Duration,
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        self.write(frame)?;
        self.wait(exec_time);
        let max_len = (1 + response_len + CRC_LEN).max(STATUS_FRAME_LEN);
        let rsp = self.read(max_len)?;
        if rsp.is_empty() {
            return Err(TransportError::ReadFailed("Empty response".into()));
        }
        Ok(rsp)
    }

    /// Check if the device is still reachable.
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn write(&self, frame: &[u8]) -> Result<usize, TransportError> {
        (**self).write(frame)
    }

    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(max_len)
    }

    fn wait(&self, exec_time: Duration) {
        (**self).wait(exec_time)
    }

    fn send_and_receive(
        &self,
        frame: &[u8],
        exec_time: Duration,
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).send_and_receive(frame, exec_time, response_len)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
