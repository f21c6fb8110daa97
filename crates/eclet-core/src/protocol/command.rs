//! Command packet construction.
//!
//! A command is built fresh for every operation and encoded into the
//! fixed-layout frame the device expects:
//!
//! ```text
//! | 0x03 | count | opcode | param1 | param2 (LE) | data ... | crc16 (LE) |
//! ```
//!
//! `count` covers itself through the CRC; the CRC covers `count` through the
//! last data byte.

use std::fmt;
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use super::constants::{
    COMMAND_HEADER_LEN, CRC_LEN, MAX_DATA_LEN, WORD_ADDRESS_COMMAND, opcode_name,
};
use super::crc::crc16_bytes;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Payload too large: {len} bytes, maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// A single device command.
///
/// The data payload may carry digests or key material, so it is wiped when
/// the command is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    opcode: u8,
    param1: u8,
    param2: u16,
    data: Vec<u8>,
    exec_time: Duration,
}

impl Command {
    /// Create a command with no payload.
    pub fn new(opcode: u8, param1: u8, param2: u16) -> Self {
        Self {
            opcode,
            param1,
            param2,
            data: Vec::new(),
            exec_time: Duration::ZERO,
        }
    }

    /// Attach a payload. Fails if the frame would exceed the device buffer.
    pub fn with_data(mut self, data: &[u8]) -> Result<Self, CommandError> {
        if data.len() > MAX_DATA_LEN {
            return Err(CommandError::PayloadTooLarge {
                len: data.len(),
                max: MAX_DATA_LEN,
            });
        }
        self.data.zeroize();
        self.data = data.to_vec();
        Ok(self)
    }

    /// Set the execution delay the transport waits before polling.
    pub fn with_exec_time(mut self, exec_time: Duration) -> Self {
        self.exec_time = exec_time;
        self
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn param1(&self) -> u8 {
        self.param1
    }

    pub fn param2(&self) -> u16 {
        self.param2
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn exec_time(&self) -> Duration {
        self.exec_time
    }

    /// Value of the count byte: count + header + data + CRC.
    pub fn count(&self) -> u8 {
        // Bounded by MAX_FRAME_LEN, always fits.
        (COMMAND_HEADER_LEN + self.data.len() + CRC_LEN) as u8
    }

    /// Opcode, param1, param2 and data: the bytes the CRC protects after count.
    pub fn payload(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Zeroizing::new(Vec::with_capacity(4 + self.data.len()));
        buf.push(self.opcode);
        buf.push(self.param1);
        let mut param2 = [0u8; 2];
        LittleEndian::write_u16(&mut param2, self.param2);
        buf.extend_from_slice(&param2);
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Encode the complete frame, including word address, count and CRC.
    pub fn to_frame(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Zeroizing::new(Vec::with_capacity(
            1 + COMMAND_HEADER_LEN + self.data.len() + CRC_LEN,
        ));
        buf.push(WORD_ADDRESS_COMMAND);
        buf.push(self.count());
        buf.extend_from_slice(&self.payload());
        let crc = crc16_bytes(&buf[1..]);
        buf.extend_from_slice(&crc);
        buf
    }
}

impl Drop for Command {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payload bytes are not printed.
        f.debug_struct("Command")
            .field("opcode", &format_args!("0x{:02X} ({})", self.opcode, opcode_name(self.opcode)))
            .field("param1", &format_args!("0x{:02X}", self.param1))
            .field("param2", &format_args!("0x{:04X}", self.param2))
            .field("data_len", &self.data.len())
            .field("exec_time", &self.exec_time)
            .finish()
    }
}
