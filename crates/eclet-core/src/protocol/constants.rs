//! Protocol constants for the ECC secure element command set.
//!
//! Values follow the device datasheet; timings are typical execution times
//! in microseconds and are handed to the transport as the settle delay.

use std::time::Duration;

// ============================================================================
// Framing
// ============================================================================

/// Word address that prefixes every command frame on the bus.
pub const WORD_ADDRESS_COMMAND: u8 = 0x03;

/// Count + opcode + param1 + param2 (2 bytes).
pub const COMMAND_HEADER_LEN: usize = 5;

/// Trailing CRC-16 length.
pub const CRC_LEN: usize = 2;

/// Largest command frame the device input buffer accepts (count through CRC).
pub const MAX_FRAME_LEN: usize = 155;

/// Largest data payload a single command can carry.
pub const MAX_DATA_LEN: usize = MAX_FRAME_LEN - COMMAND_HEADER_LEN - CRC_LEN;

/// Count + status + CRC.
pub const STATUS_FRAME_LEN: usize = 4;

// ============================================================================
// Opcodes
// ============================================================================

pub const OP_DERIVE_KEY: u8 = 0x1C;
pub const OP_DEV_REV: u8 = 0x30;
pub const OP_GEN_DIG: u8 = 0x15;
pub const OP_HMAC: u8 = 0x11;
pub const OP_CHECK_MAC: u8 = 0x28;
pub const OP_LOCK: u8 = 0x17;
pub const OP_MAC: u8 = 0x08;
pub const OP_NONCE: u8 = 0x16;
pub const OP_PAUSE: u8 = 0x01;
pub const OP_RANDOM: u8 = 0x1B;
pub const OP_READ: u8 = 0x02;
pub const OP_UPDATE_EXTRA: u8 = 0x20;
pub const OP_WRITE: u8 = 0x12;
pub const OP_GEN_KEY: u8 = 0x40;
pub const OP_SIGN: u8 = 0x41;
pub const OP_VERIFY: u8 = 0x45;

/// Human readable opcode name for logs.
pub fn opcode_name(opcode: u8) -> &'static str {
    match opcode {
        OP_DERIVE_KEY => "DeriveKey",
        OP_DEV_REV => "DevRev",
        OP_GEN_DIG => "GenDig",
        OP_HMAC => "HMAC",
        OP_CHECK_MAC => "CheckMac",
        OP_LOCK => "Lock",
        OP_MAC => "MAC",
        OP_NONCE => "Nonce",
        OP_PAUSE => "Pause",
        OP_RANDOM => "Random",
        OP_READ => "Read",
        OP_UPDATE_EXTRA => "UpdateExtra",
        OP_WRITE => "Write",
        OP_GEN_KEY => "GenKey",
        OP_SIGN => "Sign",
        OP_VERIFY => "Verify",
        _ => "Unknown",
    }
}

// ============================================================================
// Mode bits (param1)
// ============================================================================

/// Read/Write: transfer a 32-byte block instead of a 4-byte word.
pub const MODE_BLOCK_32: u8 = 0b1000_0000;

/// Random: mode 0 updates the seed, mode 1 leaves it untouched.
pub const RANDOM_MODE_UPDATE_SEED: u8 = 0x00;
pub const RANDOM_MODE_NO_SEED_UPDATE: u8 = 0x01;

/// Nonce: combine 20 input bytes with the RNG and update the seed.
pub const NONCE_MODE_RANDOM_UPDATE_SEED: u8 = 0x00;
/// Nonce: combine 20 input bytes with the RNG, no seed update.
pub const NONCE_MODE_RANDOM_NO_SEED_UPDATE: u8 = 0x01;
/// Nonce: load 32 input bytes straight into TempKey.
pub const NONCE_MODE_PASS_THROUGH: u8 = 0x03;

/// Nonce input lengths per mode.
pub const NONCE_RANDOM_INPUT_LEN: usize = 20;
pub const NONCE_PASS_THROUGH_INPUT_LEN: usize = 32;

/// Lock: zone selector bits.
pub const LOCK_ZONE_CONFIG: u8 = 0x00;
pub const LOCK_ZONE_DATA_OTP: u8 = 0x01;
/// Lock: skip the CRC summary check.
pub const LOCK_MODE_IGNORE_CRC: u8 = 0x80;

/// GenKey: create a new private key and return its public key.
pub const GENKEY_MODE_PRIVATE: u8 = 0x04;
/// GenKey: recompute the public key of an existing private key.
pub const GENKEY_MODE_PUBLIC: u8 = 0x00;

/// Sign: message comes from TempKey loaded by an external Nonce.
pub const SIGN_MODE_EXTERNAL: u8 = 0x80;

/// Verify: signature and public key supplied by the host.
pub const VERIFY_MODE_EXTERNAL: u8 = 0x02;
/// Verify: key type selector for NIST P-256.
pub const VERIFY_KEY_TYPE_P256: u16 = 0x0004;

// ============================================================================
// Response sizes
// ============================================================================

pub const RANDOM_RSP_LEN: usize = 32;
pub const WORD_LEN: usize = 4;
pub const BLOCK_LEN: usize = 32;
pub const STATUS_RSP_LEN: usize = 1;
pub const PUBLIC_KEY_LEN: usize = 64;
pub const SIGNATURE_LEN: usize = 64;
pub const NONCE_RANDOM_RSP_LEN: usize = 32;

// ============================================================================
// Execution times
// ============================================================================

pub const RANDOM_EXEC: Duration = Duration::from_micros(11_000);
pub const READ_EXEC: Duration = Duration::from_micros(1_000);
pub const WRITE_EXEC: Duration = Duration::from_micros(7_000);
pub const LOCK_EXEC: Duration = Duration::from_micros(8_000);
pub const NONCE_EXEC: Duration = Duration::from_micros(7_000);
pub const GEN_KEY_EXEC: Duration = Duration::from_micros(115_000);
pub const SIGN_EXEC: Duration = Duration::from_micros(50_000);
pub const VERIFY_EXEC: Duration = Duration::from_micros(58_000);

// ============================================================================
// Memory map
// ============================================================================

/// Config zone size in bytes.
pub const CONFIG_ZONE_LEN: usize = 128;
/// OTP zone size in bytes.
pub const OTP_ZONE_LEN: usize = 64;
/// Number of addressable data slots.
pub const DATA_SLOT_COUNT: usize = 16;
/// Data slot size in bytes.
pub const DATA_SLOT_LEN: usize = 32;

/// Config block (32-byte read address) holding the lock bytes.
pub const LOCK_STATUS_READ_ADDR: u8 = 0x10;
/// Offset of LockValue (data/OTP) inside that block.
pub const LOCK_VALUE_OFFSET: usize = 22;
/// Offset of LockConfig inside that block.
pub const LOCK_CONFIG_OFFSET: usize = 23;
/// Lock byte value while a zone is still unlocked.
pub const LOCK_UNLOCKED: u8 = 0x55;
/// Lock byte value written by a successful Lock command.
pub const LOCK_LOCKED: u8 = 0x00;

/// Absolute config byte offsets of the lock bytes.
pub const CONFIG_LOCK_VALUE_BYTE: usize = 86;
pub const CONFIG_LOCK_CONFIG_BYTE: usize = 87;

/// Config word holding the OTP mode byte, and its offset in that word.
pub const OTP_MODE_WORD_ADDR: u8 = 0x04;
pub const OTP_MODE_WORD_OFFSET: usize = 2;
/// Absolute config byte offset of the OTP mode.
pub const CONFIG_OTP_MODE_BYTE: usize = 18;
/// OTP mode: read-only after the data/OTP lock.
pub const OTP_MODE_READ_ONLY: u8 = 0xAA;

/// Config words carrying the serial number.
pub const SERIAL_WORD_0: u8 = 0x00;
pub const SERIAL_WORD_1: u8 = 0x02;
pub const SERIAL_WORD_2: u8 = 0x03;
pub const SERIAL_NUMBER_LEN: usize = 9;
