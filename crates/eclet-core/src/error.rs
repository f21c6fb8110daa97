//! Error taxonomy for device operations.

use thiserror::Error;

use crate::protocol::{CommandError, ResponseError, StatusCode, opcode_name};
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum EcletError {
    /// The bus failed to carry the exchange.
    #[error("Bus error: {0}")]
    Bus(#[from] TransportError),

    /// The response frame cannot be trusted.
    #[error("Integrity error: {0}")]
    Integrity(#[from] ResponseError),

    /// The device answered with a well-formed failure status.
    #[error("{} rejected by device: {status}", op_name(.opcode))]
    DeviceRejected { opcode: u8, status: StatusCode },

    /// Operation invoked outside its lifecycle state or session ordering.
    /// Nothing was sent to the device.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// The device reported an impossible combination of state.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn op_name(opcode: &u8) -> &'static str {
    opcode_name(*opcode)
}

impl EcletError {
    /// True for failures where the response content cannot be relied upon.
    pub fn is_bus_level(&self) -> bool {
        matches!(self, EcletError::Bus(_) | EcletError::Integrity(_))
    }

    pub fn is_device_rejected(&self) -> bool {
        matches!(self, EcletError::DeviceRejected { .. })
    }
}

impl From<CommandError> for EcletError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::PayloadTooLarge { len, max } => EcletError::PayloadTooLarge { len, max },
        }
    }
}

impl From<toml::de::Error> for EcletError {
    fn from(e: toml::de::Error) -> Self {
        EcletError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for EcletError {
    fn from(e: toml::ser::Error) -> Self {
        EcletError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EcletError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OP_WRITE;

    #[test]
    fn test_bus_level_classification() {
        assert!(EcletError::Bus(TransportError::Disconnected).is_bus_level());
        assert!(EcletError::Integrity(ResponseError::CrcMismatch).is_bus_level());
        assert!(
            !EcletError::DeviceRejected {
                opcode: OP_WRITE,
                status: StatusCode::ExecutionError
            }
            .is_bus_level()
        );
        assert!(!EcletError::Precondition("x".into()).is_bus_level());
    }

    #[test]
    fn test_rejection_message_names_opcode() {
        let e = EcletError::DeviceRejected {
            opcode: OP_WRITE,
            status: StatusCode::ExecutionError,
        };
        assert_eq!(e.to_string(), "Write rejected by device: execution error");
    }

    #[test]
    fn test_payload_too_large_conversion() {
        let e: EcletError = CommandError::PayloadTooLarge { len: 200, max: 148 }.into();
        assert!(matches!(e, EcletError::PayloadTooLarge { len: 200, max: 148 }));
    }
}
