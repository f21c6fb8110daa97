//! Device handle.
//!
//! Owns the transport and the per-handle session bookkeeping, and provides
//! the raw command primitives (Random, Read, Write) that the lifecycle,
//! nonce, ECC and personalization layers build on.

use std::sync::Arc;

use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::error::{EcletError, Result};
use crate::events::{EcletEvent, EcletObserver, LogLevel, PacketDirection, TracingObserver};
use crate::protocol::constants::*;
use crate::protocol::{Command, Response, ResponseError, StatusCode, parse_response};
use crate::state::DeviceState;
use crate::transport::Transport;
use crate::zone::{Zone, slot_to_address};

/// Exclusive handle on one secure element.
///
/// Every operation takes `&mut self`: the chip runs one command at a time
/// and the working digest register is shared state on the device.
pub struct Device<T: Transport> {
    transport: T,
    observer: Arc<dyn EcletObserver>,
    /// A pass-through nonce was the last command sent.
    digest_loaded: bool,
    /// Highest lifecycle state observed through this handle.
    highest_state: Option<DeviceState>,
}

impl<T: Transport> Device<T> {
    /// Create a handle with the default tracing observer.
    pub fn new(transport: T) -> Self {
        Self::with_observer(transport, Arc::new(TracingObserver))
    }

    /// Create a handle with a custom observer.
    pub fn with_observer(transport: T, observer: Arc<dyn EcletObserver>) -> Self {
        Self {
            transport,
            observer,
            digest_loaded: false,
            highest_state: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub(crate) fn emit(&self, event: EcletEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn is_digest_loaded(&self) -> bool {
        self.digest_loaded
    }

    pub(crate) fn mark_digest_loaded(&mut self) {
        self.digest_loaded = true;
    }

    /// Record an observed state, rejecting any move backwards.
    pub(crate) fn record_state(&mut self, state: DeviceState) -> Result<()> {
        if let Some(highest) = self.highest_state {
            if state < highest {
                tracing::error!(
                    observed = %state,
                    previous = %highest,
                    "Lifecycle went backwards"
                );
                return Err(EcletError::Invariant(format!(
                    "device state regressed from {} to {}",
                    highest, state
                )));
            }
        }
        self.highest_state = Some(state);
        self.emit(EcletEvent::StateObserved { state });
        Ok(())
    }

    /// Send a command and return its result payload of `expected_len` bytes.
    ///
    /// Any command clears the loaded-digest flag; only a successful
    /// pass-through nonce sets it again.
    pub(crate) fn execute(
        &mut self,
        cmd: Command,
        expected_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.digest_loaded = false;

        debug!(
            opcode = %opcode_name(cmd.opcode()),
            param1 = %format!("0x{:02X}", cmd.param1()),
            param2 = %format!("0x{:04X}", cmd.param2()),
            len = cmd.data().len(),
            exec_us = cmd.exec_time().as_micros() as u64,
            "Sending command"
        );

        let frame = cmd.to_frame();
        self.emit(EcletEvent::Packet {
            direction: PacketDirection::Tx,
            opcode: cmd.opcode(),
            length: frame.len(),
        });

        let raw = Zeroizing::new(
            self.transport
                .send_and_receive(&frame, cmd.exec_time(), expected_len)?,
        );
        self.emit(EcletEvent::Packet {
            direction: PacketDirection::Rx,
            opcode: cmd.opcode(),
            length: raw.len(),
        });

        match parse_response(&raw, expected_len)? {
            Response::Data(payload) => Ok(payload),
            Response::Status(StatusCode::Success) => Err(EcletError::Integrity(
                ResponseError::UnexpectedLength {
                    expected: expected_len,
                    actual: STATUS_RSP_LEN,
                },
            )),
            Response::Status(status) => Err(self.rejected(cmd.opcode(), status)),
        }
    }

    fn rejected(&self, opcode: u8, status: StatusCode) -> EcletError {
        self.emit(EcletEvent::Log {
            level: LogLevel::Warn,
            message: format!("{} rejected by device: {}", opcode_name(opcode), status),
        });
        EcletError::DeviceRejected { opcode, status }
    }

    /// Send a command whose only result is a status byte.
    pub(crate) fn execute_status(&mut self, cmd: Command) -> Result<()> {
        let opcode = cmd.opcode();
        let rsp = self.execute(cmd, STATUS_RSP_LEN)?;
        match StatusCode::from_byte(rsp[0]) {
            StatusCode::Success => Ok(()),
            status => Err(self.rejected(opcode, status)),
        }
    }

    // ------------------------------------------------------------------
    // Random
    // ------------------------------------------------------------------

    /// 32 bytes from the device RNG.
    ///
    /// Before the config zone is locked the device returns a fixed test
    /// pattern instead of random data.
    #[instrument(skip(self))]
    pub fn random(&mut self, update_seed: bool) -> Result<Zeroizing<Vec<u8>>> {
        let mode = if update_seed {
            RANDOM_MODE_UPDATE_SEED
        } else {
            RANDOM_MODE_NO_SEED_UPDATE
        };
        let cmd = Command::new(OP_RANDOM, mode, 0).with_exec_time(RANDOM_EXEC);
        self.execute(cmd, RANDOM_RSP_LEN)
    }

    // ------------------------------------------------------------------
    // Zone access
    // ------------------------------------------------------------------

    /// Read one 4-byte word at a raw word address.
    pub fn read4(&mut self, zone: Zone, word_addr: u8) -> Result<[u8; WORD_LEN]> {
        let cmd = Command::new(OP_READ, zone.mode_bits(), word_addr as u16)
            .with_exec_time(READ_EXEC);
        let rsp = self.execute(cmd, WORD_LEN)?;
        let mut word = [0u8; WORD_LEN];
        word.copy_from_slice(&rsp);
        Ok(word)
    }

    /// Read one 32-byte block or slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is outside the zone's range.
    pub fn read32(&mut self, zone: Zone, slot: u8) -> Result<Zeroizing<Vec<u8>>> {
        let addr = slot_to_address(zone, slot);
        let cmd = Command::new(OP_READ, zone.mode_bits() | MODE_BLOCK_32, addr as u16)
            .with_exec_time(READ_EXEC);
        self.execute(cmd, BLOCK_LEN)
    }

    /// Plaintext write of one 4-byte word.
    pub fn write4(&mut self, zone: Zone, word_addr: u8, word: &[u8; WORD_LEN]) -> Result<()> {
        let cmd = Command::new(OP_WRITE, zone.mode_bits(), word_addr as u16)
            .with_data(word)?
            .with_exec_time(WRITE_EXEC);
        self.execute_status(cmd)
    }

    /// Plaintext write of one 32-byte block or slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is outside the zone's range.
    pub fn write32(&mut self, zone: Zone, slot: u8, block: &[u8; BLOCK_LEN]) -> Result<()> {
        let addr = slot_to_address(zone, slot);
        let cmd = Command::new(OP_WRITE, zone.mode_bits() | MODE_BLOCK_32, addr as u16)
            .with_data(block)?
            .with_exec_time(WRITE_EXEC);
        self.execute_status(cmd)
    }

    /// The 9-byte device serial number.
    #[instrument(skip(self))]
    pub fn serial_number(&mut self) -> Result<[u8; SERIAL_NUMBER_LEN]> {
        let w0 = self.read4(Zone::Config, SERIAL_WORD_0)?;
        let w1 = self.read4(Zone::Config, SERIAL_WORD_1)?;
        let w2 = self.read4(Zone::Config, SERIAL_WORD_2)?;

        let mut serial = [0u8; SERIAL_NUMBER_LEN];
        serial[..4].copy_from_slice(&w0);
        serial[4..8].copy_from_slice(&w1);
        serial[8] = w2[0];
        Ok(serial)
    }

    /// The full 128-byte config zone, read word by word.
    #[instrument(skip(self))]
    pub fn config_zone(&mut self) -> Result<[u8; CONFIG_ZONE_LEN]> {
        let mut config = [0u8; CONFIG_ZONE_LEN];
        for (word_addr, chunk) in config.chunks_exact_mut(WORD_LEN).enumerate() {
            chunk.copy_from_slice(&self.read4(Zone::Config, word_addr as u8)?);
        }
        Ok(config)
    }

    /// The 64-byte OTP zone. Only readable once the device is personalized.
    #[instrument(skip(self))]
    pub fn otp_zone(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let state = self.current_state()?;
        if state != DeviceState::Personalized {
            return Err(EcletError::Precondition(format!(
                "OTP zone is readable only when personalized (device is {})",
                state
            )));
        }

        let mut otp = Zeroizing::new(Vec::with_capacity(OTP_ZONE_LEN));
        for block in 0..=Zone::Otp.max_slot() {
            otp.extend_from_slice(&self.read32(Zone::Otp, block)?);
        }
        Ok(otp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullObserver, RecordingObserver};
    use crate::transport::{MockTransport, SimulatedDevice};

    #[test]
    fn test_random_frame_and_payload() {
        let mock = MockTransport::new();
        mock.queue_payload(&[0x5A; 32]);
        let mut dev = Device::new(mock.clone());

        let rnd = dev.random(true).unwrap();
        assert_eq!(&rnd[..], &[0x5A; 32]);
        assert_eq!(
            mock.get_writes()[0],
            vec![0x03, 0x07, 0x1B, 0x00, 0x00, 0x00, 0x24, 0xCD]
        );
    }

    #[test]
    fn test_status_in_place_of_data_is_rejection() {
        let mock = MockTransport::new();
        mock.queue_status(StatusCode::ExecutionError);
        let mut dev = Device::new(mock);

        let err = dev.random(true).unwrap_err();
        assert!(matches!(
            err,
            EcletError::DeviceRejected {
                opcode: OP_RANDOM,
                status: StatusCode::ExecutionError
            }
        ));
    }

    #[test]
    fn test_corrupted_response_is_integrity_error() {
        let mock = MockTransport::new();
        mock.queue_corrupted(&[0x00]);
        let mut dev = Device::new(mock);

        let err = dev.write4(Zone::Config, 5, &[0; 4]).unwrap_err();
        assert!(matches!(err, EcletError::Integrity(_)));
        assert!(err.is_bus_level());
    }

    #[test]
    fn test_timeout_is_bus_error() {
        let mut dev = Device::new(MockTransport::new());
        let err = dev.read4(Zone::Config, 0).unwrap_err();
        assert!(matches!(err, EcletError::Bus(_)));
    }

    #[test]
    fn test_write_rejection_carries_status() {
        let mock = MockTransport::new();
        mock.queue_status(StatusCode::ExecutionError);
        let mut dev = Device::new(mock);

        let err = dev.write32(Zone::Otp, 0, &[0; 32]).unwrap_err();
        assert!(matches!(
            err,
            EcletError::DeviceRejected {
                opcode: OP_WRITE,
                status: StatusCode::ExecutionError
            }
        ));
    }

    #[test]
    fn test_serial_number_from_sim() {
        let serial = [0x01, 0x23, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0xEE];
        let mut dev = Device::new(SimulatedDevice::with_serial(serial, 3));
        assert_eq!(dev.serial_number().unwrap(), serial);
    }

    #[test]
    fn test_config_zone_matches_sim() {
        let sim = SimulatedDevice::with_seed(3);
        let expected = sim.config_zone();
        let mut dev = Device::new(&sim);
        assert_eq!(dev.config_zone().unwrap(), expected);
        assert_eq!(sim.count_opcode(OP_READ), 32);
    }

    #[test]
    fn test_otp_zone_requires_personalized() {
        let sim = SimulatedDevice::with_seed(3);
        let mut dev = Device::new(&sim);

        let err = dev.otp_zone().unwrap_err();
        assert!(matches!(err, EcletError::Precondition(_)));
        // Only the lock status block was read.
        assert_eq!(sim.opcode_log(), vec![OP_READ]);
    }

    #[test]
    fn test_packet_events() {
        let mock = MockTransport::new();
        mock.queue_payload(&[0; 4]);
        let observer = Arc::new(RecordingObserver::new());
        let mut dev = Device::with_observer(mock, observer.clone());

        dev.read4(Zone::Config, 0).unwrap();
        let events = observer.events();
        assert!(matches!(
            events[0],
            EcletEvent::Packet { direction: PacketDirection::Tx, opcode: OP_READ, length: 8 }
        ));
        assert!(matches!(
            events[1],
            EcletEvent::Packet { direction: PacketDirection::Rx, opcode: OP_READ, length: 7 }
        ));
    }

    #[test]
    fn test_rejection_emits_warning_event() {
        let mock = MockTransport::new();
        mock.queue_status(StatusCode::ParseError);
        let observer = Arc::new(RecordingObserver::new());
        let mut dev = Device::with_observer(mock, observer.clone());

        assert!(dev.write4(Zone::Config, 5, &[0; 4]).unwrap_err().is_device_rejected());
        let warnings: Vec<String> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                EcletEvent::Log { level: LogLevel::Warn, message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with(opcode_name(OP_WRITE)));
    }

    #[test]
    fn test_null_observer_handle() {
        let sim = SimulatedDevice::with_seed(3);
        let mut dev = Device::with_observer(&sim, Arc::new(NullObserver));
        assert_eq!(dev.current_state().unwrap(), DeviceState::Factory);
        assert_eq!(dev.serial_number().unwrap(), crate::transport::sim::SIM_SERIAL);
    }
}
