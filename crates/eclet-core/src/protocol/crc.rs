//! CRC-16 used for frame integrity and lock summaries.
//!
//! Polynomial 0x8005, input bits processed LSB first, register not reflected
//! on output, zero init. Serialized little-endian on the wire.

use crc::{Algorithm, Crc};

pub const CRC_16_ECC508: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x8005,
    init: 0x0000,
    refin: true,
    refout: false,
    xorout: 0x0000,
    check: 0xBCDD,
    residue: 0x0000,
};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ECC508);

/// Compute the CRC-16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// CRC-16 of `data` in wire order.
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Check a trailing little-endian CRC against the bytes preceding it.
pub fn is_crc_valid(data: &[u8], crc: &[u8]) -> bool {
    crc.len() == 2 && crc16_bytes(data) == [crc[0], crc[1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0xBCDD);
    }

    #[test]
    fn test_success_status_frame() {
        // The canonical "04 00 03 40" success response.
        assert_eq!(crc16_bytes(&[0x04, 0x00]), [0x03, 0x40]);
        assert!(is_crc_valid(&[0x04, 0x00], &[0x03, 0x40]));
        assert!(!is_crc_valid(&[0x04, 0x01], &[0x03, 0x40]));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16(&[]), 0);
    }
}
