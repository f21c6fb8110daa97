//! Protocol module - command framing, responses and constants.

pub mod command;
pub mod constants;
pub mod crc;
pub mod response;

pub use command::{Command, CommandError};
pub use constants::*;
pub use response::{Response, ResponseError, StatusCode, parse_response};
