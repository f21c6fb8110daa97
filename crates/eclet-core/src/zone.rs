//! Zone addressing.
//!
//! Maps a logical zone and slot to the address byte and mode bits used in
//! param1/param2. Out-of-range slots are programming errors and panic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical memory zones of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// Identity, policy and lock bytes.
    Config,
    /// One-time programmable bytes. Shares its lock with `Data`.
    Otp,
    /// Key slots.
    Data,
}

/// Address shift applied to a slot/block index.
pub const SLOT_SHIFT: u8 = 3;

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Config, Zone::Otp, Zone::Data];

    /// Zone selector bits for param1.
    pub const fn mode_bits(self) -> u8 {
        match self {
            Zone::Config => 0b0000_0000,
            Zone::Otp => 0b0000_0001,
            Zone::Data => 0b0000_0010,
        }
    }

    /// Highest valid slot index.
    pub const fn max_slot(self) -> u8 {
        match self {
            Zone::Config => 2,
            Zone::Otp => 1,
            Zone::Data => 15,
        }
    }

    /// Inverse of `mode_bits`; unknown selectors yield `None`.
    pub fn from_mode_bits(bits: u8) -> Option<Zone> {
        match bits & 0b0000_0011 {
            0b00 => Some(Zone::Config),
            0b01 => Some(Zone::Otp),
            0b10 => Some(Zone::Data),
            _ => None,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Config => write!(f, "Config"),
            Zone::Otp => write!(f, "OTP"),
            Zone::Data => write!(f, "Data"),
        }
    }
}

/// Zone selector bits for param1.
pub const fn zone_mode_bits(zone: Zone) -> u8 {
    zone.mode_bits()
}

/// Convert a slot number to its address byte.
///
/// # Panics
///
/// Panics if `slot` is outside the zone's range (Config 0..=2, OTP 0..=1,
/// Data 0..=15).
pub fn slot_to_address(zone: Zone, slot: u8) -> u8 {
    assert!(
        slot <= zone.max_slot(),
        "slot {} out of range for {} zone (max {})",
        slot,
        zone,
        zone.max_slot()
    );
    slot << SLOT_SHIFT
}

/// Recover the slot number from an address byte.
pub const fn address_to_slot(address: u8) -> u8 {
    address >> SLOT_SHIFT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_mode_bits() {
        assert_eq!(zone_mode_bits(Zone::Config), 0x00);
        assert_eq!(zone_mode_bits(Zone::Otp), 0x01);
        assert_eq!(zone_mode_bits(Zone::Data), 0x02);
        for zone in Zone::ALL {
            assert_eq!(Zone::from_mode_bits(zone.mode_bits()), Some(zone));
            // Block-size bit does not disturb the selector.
            assert_eq!(Zone::from_mode_bits(0x80 | zone.mode_bits()), Some(zone));
        }
        assert_eq!(Zone::from_mode_bits(0x03), None);
    }

    #[test]
    fn test_known_addresses() {
        assert_eq!(slot_to_address(Zone::Otp, 1), 0x08);
        assert_eq!(slot_to_address(Zone::Config, 2), 0x10);
        assert_eq!(slot_to_address(Zone::Data, 15), 0x78);
    }

    #[test]
    fn test_injective_within_zone() {
        for zone in Zone::ALL {
            let addrs: HashSet<u8> = (0..=zone.max_slot())
                .map(|s| slot_to_address(zone, s))
                .collect();
            assert_eq!(addrs.len(), zone.max_slot() as usize + 1);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_data_slot_out_of_range() {
        slot_to_address(Zone::Data, 16);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_otp_slot_out_of_range() {
        slot_to_address(Zone::Otp, 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_config_slot_out_of_range() {
        slot_to_address(Zone::Config, 3);
    }

    fn zone_and_slot() -> impl Strategy<Value = (Zone, u8)> {
        prop_oneof![
            (0u8..=2).prop_map(|s| (Zone::Config, s)),
            (0u8..=1).prop_map(|s| (Zone::Otp, s)),
            (0u8..=15).prop_map(|s| (Zone::Data, s)),
        ]
    }

    proptest! {
        #[test]
        fn prop_address_round_trips((zone, slot) in zone_and_slot()) {
            let addr = slot_to_address(zone, slot);
            prop_assert_eq!(address_to_slot(addr), slot);
            prop_assert_eq!(slot_to_address(zone, slot), addr);
        }
    }
}
