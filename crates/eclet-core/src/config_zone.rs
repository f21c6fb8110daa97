//! Config zone template written during personalization.
//!
//! Only words 4..=20 and 22..=31 are written. Words 0..=3 hold the serial
//! number and revision, word 21 holds UserExtra, Selector and the two lock
//! bytes; the device refuses plain writes to either range.

use std::ops::RangeInclusive;

use crate::protocol::constants::{CONFIG_OTP_MODE_BYTE, CONFIG_ZONE_LEN, WORD_LEN};

pub const TEMPLATE_WORDS_LOW: RangeInclusive<u8> = 4..=20;
pub const TEMPLATE_WORDS_HIGH: RangeInclusive<u8> = 22..=31;

#[rustfmt::skip]
const DEFAULT_TEMPLATE: [u8; CONFIG_ZONE_LEN] = [
    // 0..16: serial, revision, reserved (device owned)
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // I2C address, reserved, OTP mode (read-only), chip mode
    0xC0, 0x00, 0xAA, 0x00,
    // SlotConfig 0..15: slots 0..7 hold private keys, 8..15 free data
    0x8F, 0x20, 0x8F, 0x20, 0x8F, 0x20, 0x8F, 0x20,
    0x8F, 0x20, 0x8F, 0x20, 0x8F, 0x20, 0x8F, 0x20,
    0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F,
    0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F,
    // Counter[0], Counter[1]
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00,
    // LastKeyUse
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    // 84..88: UserExtra, Selector, LockValue, LockConfig (device owned)
    0x00, 0x00, 0x55, 0x55,
    // SlotLocked, RFU, X509format
    0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // KeyConfig 0..15: P-256 private keys, then plain data
    0x33, 0x00, 0x33, 0x00, 0x33, 0x00, 0x33, 0x00,
    0x33, 0x00, 0x33, 0x00, 0x33, 0x00, 0x33, 0x00,
    0x3C, 0x00, 0x3C, 0x00, 0x3C, 0x00, 0x3C, 0x00,
    0x3C, 0x00, 0x3C, 0x00, 0x3C, 0x00, 0x3C, 0x00,
];

/// A 128-byte config zone image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTemplate {
    bytes: [u8; CONFIG_ZONE_LEN],
}

impl ConfigTemplate {
    pub const fn new(bytes: [u8; CONFIG_ZONE_LEN]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8; CONFIG_ZONE_LEN] {
        &self.bytes
    }

    /// OTP mode byte this template programs.
    pub fn otp_mode(&self) -> u8 {
        self.bytes[CONFIG_OTP_MODE_BYTE]
    }

    /// `(word address, word)` pairs to write, in address order.
    pub fn writable_words(&self) -> impl Iterator<Item = (u8, [u8; WORD_LEN])> + '_ {
        TEMPLATE_WORDS_LOW
            .chain(TEMPLATE_WORDS_HIGH)
            .map(move |addr| {
                let start = addr as usize * WORD_LEN;
                let mut word = [0u8; WORD_LEN];
                word.copy_from_slice(&self.bytes[start..start + WORD_LEN]);
                (addr, word)
            })
    }
}

impl Default for ConfigTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::OTP_MODE_READ_ONLY;

    #[test]
    fn test_default_is_read_only_otp() {
        assert_eq!(ConfigTemplate::default().otp_mode(), OTP_MODE_READ_ONLY);
    }

    #[test]
    fn test_writable_words_skip_device_owned_bytes() {
        let template = ConfigTemplate::default();
        let addrs: Vec<u8> = template.writable_words().map(|(a, _)| a).collect();
        assert_eq!(addrs.len(), 27);
        assert_eq!(addrs.first(), Some(&4));
        assert_eq!(addrs.last(), Some(&31));
        assert!(!addrs.contains(&21));
        assert!(addrs.iter().all(|&a| a >= 4));
    }

    #[test]
    fn test_word_contents() {
        let template = ConfigTemplate::default();
        let (addr, word) = template.writable_words().next().unwrap();
        assert_eq!(addr, 4);
        assert_eq!(word, [0xC0, 0x00, 0xAA, 0x00]);
    }
}
