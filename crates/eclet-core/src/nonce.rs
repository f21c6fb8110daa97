//! Nonce session protocol.
//!
//! A pass-through nonce loads a 32-byte digest into the device's working
//! register (TempKey). It must be the command sent immediately before the
//! Sign or Verify that consumes it; the handle tracks this and refuses a
//! sign/verify whose digest may have been disturbed.

use tracing::instrument;
use zeroize::Zeroizing;

use crate::device::Device;
use crate::error::{EcletError, Result};
use crate::protocol::Command;
use crate::protocol::constants::*;
use crate::transport::Transport;

impl<T: Transport> Device<T> {
    /// Load an externally computed 32-byte digest into the working register.
    #[instrument(skip_all)]
    pub fn load_nonce(&mut self, digest: &[u8]) -> Result<()> {
        if digest.len() != NONCE_PASS_THROUGH_INPUT_LEN {
            return Err(EcletError::Precondition(format!(
                "digest must be {} bytes, got {}",
                NONCE_PASS_THROUGH_INPUT_LEN,
                digest.len()
            )));
        }
        let cmd = Command::new(OP_NONCE, NONCE_MODE_PASS_THROUGH, 0)
            .with_data(digest)?
            .with_exec_time(NONCE_EXEC);
        self.execute_status(cmd)?;
        self.mark_digest_loaded();
        Ok(())
    }

    /// Combine 20 host bytes with the device RNG and return the 32-byte
    /// random output.
    #[instrument(skip(self, input))]
    pub fn mix_nonce(
        &mut self,
        input: &[u8; NONCE_RANDOM_INPUT_LEN],
        update_seed: bool,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mode = if update_seed {
            NONCE_MODE_RANDOM_UPDATE_SEED
        } else {
            NONCE_MODE_RANDOM_NO_SEED_UPDATE
        };
        let cmd = Command::new(OP_NONCE, mode, 0)
            .with_data(input)?
            .with_exec_time(NONCE_EXEC);
        self.execute(cmd, NONCE_RANDOM_RSP_LEN)
    }

    /// Device health check: mix the first 20 OTP bytes into a fresh nonce.
    ///
    /// Requires a personalized device, like `otp_zone`.
    #[instrument(skip(self))]
    pub fn get_nonce(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let otp = self.otp_zone()?;
        let mut input = Zeroizing::new([0u8; NONCE_RANDOM_INPUT_LEN]);
        input.copy_from_slice(&otp[..NONCE_RANDOM_INPUT_LEN]);
        self.mix_nonce(&input, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LockChecksum;
    use crate::transport::{MockTransport, SimulatedDevice};
    use crate::zone::Zone;

    #[test]
    fn test_load_nonce_frame() {
        let mock = MockTransport::new();
        mock.queue_payload(&[0x00]);
        let mut dev = Device::new(mock.clone());

        dev.load_nonce(&[0xAA; 32]).unwrap();
        let frame = &mock.get_writes()[0];
        assert_eq!(frame.len(), 1 + 7 + 32);
        assert_eq!(&frame[..6], &[0x03, 39, OP_NONCE, 0x03, 0x00, 0x00]);
        assert!(dev.is_digest_loaded());
    }

    #[test]
    fn test_load_nonce_rejects_wrong_length() {
        let mock = MockTransport::new();
        let mut dev = Device::new(mock.clone());

        assert!(matches!(
            dev.load_nonce(&[0u8; 20]),
            Err(EcletError::Precondition(_))
        ));
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_load_nonce_non_zero_status_fails() {
        let mock = MockTransport::new();
        mock.queue_payload(&[0x0F]);
        let mut dev = Device::new(mock);

        assert!(dev.load_nonce(&[0x11; 32]).unwrap_err().is_device_rejected());
        assert!(!dev.is_digest_loaded());
    }

    #[test]
    fn test_other_command_clears_digest() {
        let sim = SimulatedDevice::with_seed(2);
        let mut dev = Device::new(&sim);

        dev.load_nonce(&[0x01; 32]).unwrap();
        assert!(dev.is_digest_loaded());
        dev.random(false).unwrap();
        assert!(!dev.is_digest_loaded());
    }

    #[test]
    fn test_get_nonce_requires_personalized() {
        let sim = SimulatedDevice::with_seed(2);
        let mut dev = Device::new(&sim);

        assert!(matches!(dev.get_nonce(), Err(EcletError::Precondition(_))));
        assert_eq!(sim.count_opcode(OP_NONCE), 0);
    }

    #[test]
    fn test_get_nonce_on_personalized_device() {
        let sim = SimulatedDevice::with_seed(2);
        let mut dev = Device::new(&sim);
        dev.lock(Zone::Config, LockChecksum::Ignore).unwrap();
        dev.lock(Zone::Data, LockChecksum::Ignore).unwrap();

        let first = dev.get_nonce().unwrap();
        let second = dev.get_nonce().unwrap();
        assert_eq!(first.len(), 32);
        assert_ne!(first, second);
    }
}
