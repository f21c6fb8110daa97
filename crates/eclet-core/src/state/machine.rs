//! Lifecycle state machine.
//!
//! The lifecycle is never stored: it is derived from the two lock bytes in
//! the config zone each time it is needed. Locks are one-way, so the state
//! only ever moves forward.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::device::Device;
use crate::error::{EcletError, Result};
use crate::events::EcletEvent;
use crate::protocol::Command;
use crate::protocol::constants::*;
use crate::transport::Transport;
use crate::zone::{Zone, address_to_slot};

/// Lifecycle of the device, ordered from blank to fully provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceState {
    /// Neither config nor data zone locked.
    Factory,
    /// Config zone locked.
    Initialized,
    /// Config and data/OTP zones locked.
    Personalized,
}

impl DeviceState {
    /// Map the two lock bits to a state.
    ///
    /// A locked data zone under an unlocked config zone cannot happen on a
    /// working device and is reported as an invariant violation.
    pub fn from_lock_bits(config_locked: bool, data_locked: bool) -> Result<Self> {
        match (config_locked, data_locked) {
            (false, false) => Ok(DeviceState::Factory),
            (true, false) => Ok(DeviceState::Initialized),
            (true, true) => Ok(DeviceState::Personalized),
            (false, true) => Err(EcletError::Invariant(
                "data zone locked while config zone is unlocked".into(),
            )),
        }
    }

    /// The state a successful lock of `zone` leads to.
    pub fn after_lock(zone: Zone) -> Self {
        match zone {
            Zone::Config => DeviceState::Initialized,
            Zone::Otp | Zone::Data => DeviceState::Personalized,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Factory => write!(f, "Factory"),
            DeviceState::Initialized => write!(f, "Initialized"),
            DeviceState::Personalized => write!(f, "Personalized"),
        }
    }
}

/// Summary handed to the Lock command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockChecksum {
    /// Device compares this CRC-16 against the zone contents before locking.
    Verify(u16),
    /// Device locks without checking contents.
    Ignore,
}

impl<T: Transport> Device<T> {
    /// Read the (config locked, data locked) pair in a single block read.
    pub fn lock_bits(&mut self) -> Result<(bool, bool)> {
        let block = self.read32(Zone::Config, address_to_slot(LOCK_STATUS_READ_ADDR))?;
        Ok((
            block[LOCK_CONFIG_OFFSET] != LOCK_UNLOCKED,
            block[LOCK_VALUE_OFFSET] != LOCK_UNLOCKED,
        ))
    }

    /// Whether the lock covering `zone` is set. OTP and Data share one lock.
    pub fn is_zone_locked(&mut self, zone: Zone) -> Result<bool> {
        let (config_locked, data_locked) = self.lock_bits()?;
        Ok(match zone {
            Zone::Config => config_locked,
            Zone::Otp | Zone::Data => data_locked,
        })
    }

    /// Lifecycle state derived from the live lock bits.
    #[instrument(skip(self))]
    pub fn current_state(&mut self) -> Result<DeviceState> {
        let (config_locked, data_locked) = self.lock_bits()?;
        let state = match DeviceState::from_lock_bits(config_locked, data_locked) {
            Ok(state) => state,
            Err(e) => {
                error!(config_locked, data_locked, "Impossible lock combination");
                return Err(e);
            }
        };
        self.record_state(state)?;
        Ok(state)
    }

    /// Lock `zone` (Config, or the shared Data/OTP pair).
    ///
    /// Locking an already locked zone succeeds without touching the device.
    /// After the Lock command the state is re-read; a state other than the
    /// expected one is an invariant violation.
    #[instrument(skip(self))]
    pub fn lock(&mut self, zone: Zone, checksum: LockChecksum) -> Result<()> {
        let target = DeviceState::after_lock(zone);
        let state = self.current_state()?;
        if state >= target {
            info!(zone = %zone, "Zone already locked");
            return Ok(());
        }
        if target == DeviceState::Personalized && state == DeviceState::Factory {
            return Err(EcletError::Precondition(
                "data/OTP zone cannot be locked before the config zone".into(),
            ));
        }

        let zone_bits = match zone {
            Zone::Config => LOCK_ZONE_CONFIG,
            Zone::Otp | Zone::Data => LOCK_ZONE_DATA_OTP,
        };
        let (param1, summary) = match checksum {
            LockChecksum::Verify(crc) => (zone_bits, crc),
            LockChecksum::Ignore => (zone_bits | LOCK_MODE_IGNORE_CRC, 0),
        };

        info!(zone = %zone, ?checksum, "Locking zone");
        let cmd = Command::new(OP_LOCK, param1, summary).with_exec_time(LOCK_EXEC);
        self.execute_status(cmd)?;
        self.emit(EcletEvent::ZoneLocked { zone });

        let after = self.current_state()?;
        if after != target {
            error!(zone = %zone, expected = %target, observed = %after, "Lock did not take effect");
            return Err(EcletError::Invariant(format!(
                "after locking {} expected {} but device reports {}",
                zone, target, after
            )));
        }
        Ok(())
    }
}
