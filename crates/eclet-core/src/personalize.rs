//! Personalization workflow.
//!
//! Moves a blank device to the requested lifecycle state:
//!
//! 1. write the config template and lock the config zone,
//! 2. confirm the OTP zone is in read-only mode,
//! 3. clear both OTP blocks, then write the revision tag and software version,
//! 4. optionally burn data slot keys,
//! 5. lock the data/OTP zones.
//!
//! The first failing step ends the run; nothing is locked until every step
//! before the lock has succeeded. An invariant violation is returned as an
//! error, any other failure is reported in the `PersonalizeReport`.

use tracing::{info, instrument};
use zeroize::Zeroizing;

use crate::config::EcletConfig;
use crate::config_zone::ConfigTemplate;
use crate::device::Device;
use crate::error::{EcletError, Result};
use crate::events::{EcletEvent, PersonalizeStep};
use crate::protocol::constants::*;
use crate::protocol::crc::crc16;
use crate::secret::KeyContainer;
use crate::state::{DeviceState, LockChecksum};
use crate::transport::Transport;
use crate::zone::Zone;

/// Inputs to `Device::personalize`.
#[derive(Debug)]
pub struct PersonalizeOptions {
    pub template: ConfigTemplate,
    pub verify_config_crc: bool,
    pub verify_data_crc: bool,
    pub revision_tag: String,
    pub software_version: String,
    pub keys: Option<KeyContainer>,
}

impl Default for PersonalizeOptions {
    fn default() -> Self {
        Self::from(&EcletConfig::default())
    }
}

impl From<&EcletConfig> for PersonalizeOptions {
    fn from(config: &EcletConfig) -> Self {
        Self {
            template: ConfigTemplate::default(),
            verify_config_crc: config.verify_config_crc,
            verify_data_crc: config.verify_data_crc,
            revision_tag: config.revision_tag.clone(),
            software_version: config.software_version.clone(),
            keys: None,
        }
    }
}

/// The step that stopped a personalization run.
#[derive(Debug)]
pub struct PersonalizeFailure {
    pub step: PersonalizeStep,
    pub error: EcletError,
}

/// Outcome of a personalization run.
#[derive(Debug)]
pub struct PersonalizeReport {
    pub goal: DeviceState,
    /// Last confirmed device state.
    pub state: DeviceState,
    pub failure: Option<PersonalizeFailure>,
}

impl PersonalizeReport {
    pub fn reached_goal(&self) -> bool {
        self.state >= self.goal
    }
}

type StepResult<R> = std::result::Result<R, (PersonalizeStep, EcletError)>;

fn padded_block(text: &str, what: &str) -> Result<[u8; BLOCK_LEN]> {
    let bytes = text.as_bytes();
    if bytes.len() > BLOCK_LEN {
        return Err(EcletError::Precondition(format!(
            "{} is {} bytes, OTP blocks hold {}",
            what,
            bytes.len(),
            BLOCK_LEN
        )));
    }
    let mut block = [0u8; BLOCK_LEN];
    block[..bytes.len()].copy_from_slice(bytes);
    Ok(block)
}

/// OTP image written during personalization: tag in block 0, version in block 1.
pub fn otp_image(revision_tag: &str, software_version: &str) -> Result<[u8; OTP_ZONE_LEN]> {
    let mut image = [0u8; OTP_ZONE_LEN];
    image[..BLOCK_LEN].copy_from_slice(&padded_block(revision_tag, "revision tag")?);
    image[BLOCK_LEN..].copy_from_slice(&padded_block(software_version, "software version")?);
    Ok(image)
}

impl<T: Transport> Device<T> {
    /// Run one workflow step, emitting its start and outcome.
    fn step<R>(
        &mut self,
        step: PersonalizeStep,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> StepResult<R> {
        self.emit(EcletEvent::StepStarted { step });
        match f(self) {
            Ok(r) => {
                self.emit(EcletEvent::StepCompleted { step });
                Ok(r)
            }
            Err(e) => {
                self.emit(EcletEvent::StepFailed {
                    step,
                    message: e.to_string(),
                });
                Err((step, e))
            }
        }
    }

    /// Provision the device up to `goal`.
    ///
    /// Returns immediately, without touching any zone, when the device is
    /// already at or past `goal`. Callers must compare `report.state` with
    /// the goal rather than assume success.
    #[instrument(skip(self, opts))]
    pub fn personalize(
        &mut self,
        goal: DeviceState,
        opts: &PersonalizeOptions,
    ) -> Result<PersonalizeReport> {
        let mut state = self.current_state()?;
        info!(state = %state, goal = %goal, "Starting personalization");

        let failure = if state >= goal {
            None
        } else {
            match self.personalize_steps(goal, opts, &mut state) {
                Ok(()) => None,
                Err((_, e @ EcletError::Invariant(_))) => return Err(e),
                Err((step, error)) => Some(PersonalizeFailure { step, error }),
            }
        };

        info!(state = %state, "Personalization finished");
        Ok(PersonalizeReport {
            goal,
            state,
            failure,
        })
    }

    fn personalize_steps(
        &mut self,
        goal: DeviceState,
        opts: &PersonalizeOptions,
        state: &mut DeviceState,
    ) -> StepResult<()> {
        if *state == DeviceState::Factory {
            self.step(PersonalizeStep::WriteConfig, |dev| {
                for (word_addr, word) in opts.template.writable_words() {
                    dev.write4(Zone::Config, word_addr, &word)?;
                }
                Ok(())
            })?;

            self.step(PersonalizeStep::LockConfig, |dev| {
                let checksum = if opts.verify_config_crc {
                    LockChecksum::Verify(crc16(&dev.config_zone()?))
                } else {
                    LockChecksum::Ignore
                };
                dev.lock(Zone::Config, checksum)
            })?;
            *state = DeviceState::Initialized;
        }

        if *state >= goal {
            return Ok(());
        }

        self.step(PersonalizeStep::CheckOtpMode, |dev| {
            let word = dev.read4(Zone::Config, OTP_MODE_WORD_ADDR)?;
            let mode = word[OTP_MODE_WORD_OFFSET];
            if mode != OTP_MODE_READ_ONLY {
                return Err(EcletError::Precondition(format!(
                    "OTP mode is 0x{:02X}, expected read-only 0x{:02X}",
                    mode, OTP_MODE_READ_ONLY
                )));
            }
            Ok(())
        })?;

        let otp = self.step(PersonalizeStep::WriteOtp, |dev| {
            let image = otp_image(&opts.revision_tag, &opts.software_version)?;
            let zeros = [0u8; BLOCK_LEN];
            for block in 0..=Zone::Otp.max_slot() {
                dev.write32(Zone::Otp, block, &zeros)?;
            }
            for (block, chunk) in image.chunks_exact(BLOCK_LEN).enumerate() {
                let mut data = [0u8; BLOCK_LEN];
                data.copy_from_slice(chunk);
                dev.write32(Zone::Otp, block as u8, &data)?;
            }
            Ok(image)
        })?;

        let data_image = opts
            .keys
            .as_ref()
            .map(KeyContainer::data_zone_image)
            .unwrap_or_else(|| KeyContainer::new().data_zone_image());
        let has_keys = opts.keys.as_ref().is_some_and(|k| !k.is_empty());

        if has_keys || opts.verify_data_crc {
            self.step(PersonalizeStep::WriteKeys, |dev| {
                for (slot, chunk) in data_image.as_bytes().chunks_exact(DATA_SLOT_LEN).enumerate() {
                    let present = opts.keys.as_ref().is_some_and(|k| k.get(slot as u8).is_some());
                    // With a data CRC every slot must match the image.
                    if present || opts.verify_data_crc {
                        let mut block = Zeroizing::new([0u8; DATA_SLOT_LEN]);
                        block.copy_from_slice(chunk);
                        dev.write32(Zone::Data, slot as u8, &block)?;
                    }
                }
                Ok(())
            })?;
        }

        self.step(PersonalizeStep::LockData, |dev| {
            let checksum = if opts.verify_data_crc {
                let mut summed =
                    Zeroizing::new(Vec::with_capacity(data_image.len() + OTP_ZONE_LEN));
                summed.extend_from_slice(data_image.as_bytes());
                summed.extend_from_slice(&otp);
                LockChecksum::Verify(crc16(&summed))
            } else {
                LockChecksum::Ignore
            };
            dev.lock(Zone::Data, checksum)
        })?;
        *state = DeviceState::Personalized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::events::RecordingObserver;
    use crate::protocol::StatusCode;
    use crate::secret::SecretBuffer;
    use crate::transport::SimulatedDevice;

    #[test]
    fn test_full_personalization() {
        let sim = SimulatedDevice::with_seed(21);
        let mut dev = Device::new(&sim);
        let opts = PersonalizeOptions::default();

        let report = dev.personalize(DeviceState::Personalized, &opts).unwrap();
        assert!(report.failure.is_none());
        assert_eq!(report.state, DeviceState::Personalized);
        assert!(report.reached_goal());
        assert!(sim.is_config_locked());
        assert!(sim.is_data_locked());

        let otp = dev.otp_zone().unwrap();
        let expected = otp_image(&opts.revision_tag, &opts.software_version).unwrap();
        assert_eq!(&otp[..], &expected[..]);
        assert_eq!(&otp[..26], b"CRYPTOTRONIX ECLET REV: A\0");
        assert_eq!(&otp[32..50], b"SOFTWARE VERSION: ");
        let config = sim.config_zone();
        let template = opts.template.bytes();
        assert_eq!(&config[16..20], &[0xC0, 0x00, 0xAA, 0x00]);
        assert_eq!(&config[16..84], &template[16..84]);
        assert_eq!(&config[88..], &template[88..]);
    }

    #[test]
    fn test_already_personalized_is_untouched() {
        let sim = SimulatedDevice::with_seed(21);
        let mut dev = Device::new(&sim);
        let opts = PersonalizeOptions::default();
        dev.personalize(DeviceState::Personalized, &opts).unwrap();

        let before = sim.snapshot();
        sim.clear_opcode_log();
        let report = dev.personalize(DeviceState::Personalized, &opts).unwrap();

        assert_eq!(report.state, DeviceState::Personalized);
        assert!(report.failure.is_none());
        assert_eq!(sim.count_opcode(OP_LOCK), 0);
        assert_eq!(sim.count_opcode(OP_WRITE), 0);
        assert_eq!(sim.snapshot(), before);
    }

    #[test]
    fn test_goal_initialized_stops_after_config_lock() {
        let sim = SimulatedDevice::with_seed(21);
        let mut dev = Device::new(&sim);

        let report = dev
            .personalize(DeviceState::Initialized, &PersonalizeOptions::default())
            .unwrap();
        assert_eq!(report.state, DeviceState::Initialized);
        assert!(sim.is_config_locked());
        assert!(!sim.is_data_locked());
        assert_eq!(sim.count_opcode(OP_LOCK), 1);
    }

    #[test]
    fn test_resumes_from_initialized() {
        let sim = SimulatedDevice::with_seed(21);
        let mut dev = Device::new(&sim);
        let opts = PersonalizeOptions::default();
        dev.personalize(DeviceState::Initialized, &opts).unwrap();

        let report = dev.personalize(DeviceState::Personalized, &opts).unwrap();
        assert_eq!(report.state, DeviceState::Personalized);
        assert_eq!(sim.count_opcode(OP_LOCK), 2);
    }

    #[test]
    fn test_otp_mode_not_read_only_aborts_before_lock() {
        let sim = SimulatedDevice::with_seed(21);
        sim.set_config_byte(CONFIG_OTP_MODE_BYTE, 0x55);
        sim.set_config_byte(CONFIG_LOCK_CONFIG_BYTE, LOCK_LOCKED);
        let mut dev = Device::new(&sim);

        let report = dev
            .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap();
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, PersonalizeStep::CheckOtpMode);
        assert!(matches!(failure.error, EcletError::Precondition(_)));
        assert_eq!(report.state, DeviceState::Initialized);
        assert_eq!(sim.count_opcode(OP_WRITE), 0);
        assert_eq!(sim.count_opcode(OP_LOCK), 0);
    }

    #[test]
    fn test_otp_write_failure_aborts_without_locking() {
        let sim = SimulatedDevice::with_seed(21);
        sim.set_config_byte(CONFIG_LOCK_CONFIG_BYTE, LOCK_LOCKED);
        sim.reject_next(OP_WRITE, StatusCode::ExecutionError);
        let mut dev = Device::new(&sim);

        let report = dev
            .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap();
        assert!(!report.reached_goal());
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, PersonalizeStep::WriteOtp);
        assert!(failure.error.is_device_rejected());
        assert!(!sim.is_data_locked());
        assert_eq!(sim.count_opcode(OP_LOCK), 0);

        // Safe to retry from scratch.
        let report = dev
            .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap();
        assert_eq!(report.state, DeviceState::Personalized);
    }

    #[test]
    fn test_bus_failure_reports_step_and_state() {
        let sim = SimulatedDevice::with_seed(21);
        sim.drop_next_response(OP_WRITE);
        let mut dev = Device::new(&sim);

        let report = dev
            .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap();
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, PersonalizeStep::WriteConfig);
        assert!(matches!(failure.error, EcletError::Bus(_)));
        assert_eq!(report.state, DeviceState::Factory);
        assert_eq!(sim.count_opcode(OP_WRITE), 1);
    }

    #[test]
    fn test_lost_state_read_is_error() {
        let sim = SimulatedDevice::with_seed(21);
        sim.drop_next_response(OP_READ);
        let mut dev = Device::new(&sim);

        let err = dev
            .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap_err();
        assert!(err.is_bus_level());
    }

    #[test]
    fn test_rejected_config_lock_reports_failure() {
        let sim = SimulatedDevice::with_seed(21);
        let mut dev = Device::new(&sim);
        sim.reject_next(OP_LOCK, StatusCode::ExecutionError);

        let report = dev
            .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap();
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, PersonalizeStep::LockConfig);
        assert_eq!(report.state, DeviceState::Factory);
        assert!(!sim.is_config_locked());
    }

    #[test]
    fn test_keys_and_data_crc() {
        let sim = SimulatedDevice::with_seed(21);
        let mut keys = KeyContainer::new();
        keys.set(0, SecretBuffer::from_slice(&[0x10; 32]));
        keys.set(9, SecretBuffer::from_slice(&[0x99; 32]));
        let opts = PersonalizeOptions {
            verify_data_crc: true,
            keys: Some(keys),
            ..Default::default()
        };
        let mut dev = Device::new(&sim);

        let report = dev.personalize(DeviceState::Personalized, &opts).unwrap();
        assert!(report.failure.is_none(), "{:?}", report.failure);
        assert_eq!(sim.data_slot(0), [0x10; 32]);
        assert_eq!(sim.data_slot(9), [0x99; 32]);
        assert_eq!(sim.data_slot(1), [0x00; 32]);
    }

    #[test]
    fn test_keys_without_data_crc_touch_only_their_slots() {
        let sim = SimulatedDevice::with_seed(21);
        let mut keys = KeyContainer::new();
        keys.set(12, SecretBuffer::from_slice(&[0xC3; 32]));
        let opts = PersonalizeOptions {
            keys: Some(keys),
            ..Default::default()
        };
        let mut dev = Device::new(&sim);

        dev.personalize(DeviceState::Personalized, &opts).unwrap();
        assert_eq!(sim.data_slot(12), [0xC3; 32]);
        assert_eq!(sim.data_slot(0), [0xFF; 32]);
    }

    #[test]
    fn test_overlong_revision_tag_aborts() {
        let sim = SimulatedDevice::with_seed(21);
        let opts = PersonalizeOptions {
            revision_tag: "X".repeat(40),
            ..Default::default()
        };
        let mut dev = Device::new(&sim);

        let report = dev.personalize(DeviceState::Personalized, &opts).unwrap();
        assert_eq!(report.failure.unwrap().step, PersonalizeStep::WriteOtp);
        assert_eq!(report.state, DeviceState::Initialized);
        assert!(!sim.is_data_locked());
    }

    #[test]
    fn test_impossible_state_is_error() {
        let sim = SimulatedDevice::with_seed(21);
        sim.set_config_byte(CONFIG_LOCK_VALUE_BYTE, LOCK_LOCKED);
        let mut dev = Device::new(&sim);

        assert!(matches!(
            dev.personalize(DeviceState::Personalized, &PersonalizeOptions::default()),
            Err(EcletError::Invariant(_))
        ));
    }

    #[test]
    fn test_step_events() {
        let sim = SimulatedDevice::with_seed(21);
        let observer = Arc::new(RecordingObserver::new());
        let mut dev = Device::with_observer(&sim, observer.clone());

        dev.personalize(DeviceState::Personalized, &PersonalizeOptions::default())
            .unwrap();
        let started: Vec<PersonalizeStep> = observer
            .events()
            .iter()
            .filter_map(|e| match e {
                EcletEvent::StepStarted { step } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![
                PersonalizeStep::WriteConfig,
                PersonalizeStep::LockConfig,
                PersonalizeStep::CheckOtpMode,
                PersonalizeStep::WriteOtp,
                PersonalizeStep::LockData,
            ]
        );
    }
}
