//! Response frame parsing and status codes.
//!
//! A response is `| count | payload ... | crc16 (LE) |`. A four byte frame
//! carrying a single byte is a status frame; when a longer result was
//! expected, that byte is an error code from the device.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

use super::constants::{CRC_LEN, STATUS_FRAME_LEN, STATUS_RSP_LEN};
use super::crc::is_crc_valid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Response too short: {actual} bytes, minimum {}", STATUS_FRAME_LEN)]
    TooShort { actual: usize },
    #[error("Count byte says {count} bytes, received {actual}")]
    LengthMismatch { count: usize, actual: usize },
    #[error("CRC mismatch in response frame")]
    CrcMismatch,
    #[error("Unexpected payload length: expected {expected}, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },
}

/// Status byte returned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    /// CheckMac or Verify miscompare.
    Miscompare,
    ParseError,
    EccFault,
    ExecutionError,
    AfterWake,
    WatchdogAboutToExpire,
    CommError,
    Unknown(u8),
}

impl StatusCode {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => StatusCode::Success,
            0x01 => StatusCode::Miscompare,
            0x03 => StatusCode::ParseError,
            0x05 => StatusCode::EccFault,
            0x0F => StatusCode::ExecutionError,
            0x11 => StatusCode::AfterWake,
            0xEE => StatusCode::WatchdogAboutToExpire,
            0xFF => StatusCode::CommError,
            other => StatusCode::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            StatusCode::Success => 0x00,
            StatusCode::Miscompare => 0x01,
            StatusCode::ParseError => 0x03,
            StatusCode::EccFault => 0x05,
            StatusCode::ExecutionError => 0x0F,
            StatusCode::AfterWake => 0x11,
            StatusCode::WatchdogAboutToExpire => 0xEE,
            StatusCode::CommError => 0xFF,
            StatusCode::Unknown(b) => b,
        }
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Success => write!(f, "success"),
            StatusCode::Miscompare => write!(f, "miscompare"),
            StatusCode::ParseError => write!(f, "parse error"),
            StatusCode::EccFault => write!(f, "ECC fault"),
            StatusCode::ExecutionError => write!(f, "execution error"),
            StatusCode::AfterWake => write!(f, "after wake"),
            StatusCode::WatchdogAboutToExpire => write!(f, "watchdog about to expire"),
            StatusCode::CommError => write!(f, "communication error"),
            StatusCode::Unknown(b) => write!(f, "unknown status 0x{:02X}", b),
        }
    }
}

/// Outcome of parsing a response frame whose integrity checked out.
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// Result payload of the expected length.
    Data(Zeroizing<Vec<u8>>),
    /// Status frame in place of a longer result.
    Status(StatusCode),
}

/// Validate framing and CRC, then classify the payload.
///
/// Nothing inside a frame that fails its CRC is exposed.
pub fn parse_response(raw: &[u8], expected_len: usize) -> Result<Response, ResponseError> {
    if raw.len() < STATUS_FRAME_LEN {
        return Err(ResponseError::TooShort { actual: raw.len() });
    }

    let count = raw[0] as usize;
    if count != raw.len() {
        return Err(ResponseError::LengthMismatch {
            count,
            actual: raw.len(),
        });
    }

    let (body, crc) = raw.split_at(raw.len() - CRC_LEN);
    if !is_crc_valid(body, crc) {
        return Err(ResponseError::CrcMismatch);
    }

    let payload = &body[1..];
    if payload.len() == expected_len {
        return Ok(Response::Data(Zeroizing::new(payload.to_vec())));
    }
    if payload.len() == STATUS_RSP_LEN {
        return Ok(Response::Status(StatusCode::from_byte(payload[0])));
    }

    Err(ResponseError::UnexpectedLength {
        expected: expected_len,
        actual: payload.len(),
    })
}

/// Build a well-formed response frame around `payload`.
pub fn encode_response(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len() + CRC_LEN);
    frame.push((1 + payload.len() + CRC_LEN) as u8);
    frame.extend_from_slice(payload);
    let crc = super::crc::crc16_bytes(&frame);
    frame.extend_from_slice(&crc);
    frame
}

/// Build a status frame.
pub fn encode_status(status: StatusCode) -> Vec<u8> {
    encode_response(&[status.to_byte()])
}
