//! Simulated secure element.
//!
//! A software model of the chip behind a `Transport`, covering the zones,
//! lock bytes, Random, Read, Write, Lock, Nonce, GenKey, Sign and Verify.
//! Signatures use a deterministic SHA-256 construction that honours the
//! protocol contract (sign with a slot key, verify against the matching
//! public key and the loaded digest); it is not P-256 arithmetic.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use zeroize::Zeroize;

use super::traits::{Transport, TransportError};
use crate::protocol::constants::*;
use crate::protocol::crc::{crc16, is_crc_valid};
use crate::protocol::response::{encode_response, encode_status};
use crate::protocol::StatusCode;
use crate::secret::SecretBuffer;
use crate::zone::Zone;

/// Default serial number of a simulated part.
pub const SIM_SERIAL: [u8; SERIAL_NUMBER_LEN] =
    [0x01, 0x23, 0x5A, 0x6B, 0x7C, 0x8D, 0x9E, 0xAF, 0xEE];

/// Factory contents of the config zone; serial bytes are patched in.
const FACTORY_CONFIG: [u8; CONFIG_ZONE_LEN] = [
    0x01, 0x23, 0x00, 0x00, 0x00, 0x00, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE, 0x01, 0x01, 0x00,
    0xC0, 0x00, 0xAA, 0x00, 0x8F, 0x20, 0xC4, 0x44, 0x87, 0x20, 0x87, 0x20, 0x8F, 0x0F, 0xC4, 0x36,
    0x9F, 0x0F, 0x82, 0x20, 0x0F, 0x0F, 0xC4, 0x44, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F,
    0x0F, 0x0F, 0x0F, 0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x55, 0x55, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x33, 0x00, 0x1C, 0x00, 0x13, 0x00, 0x13, 0x00, 0x7C, 0x00, 0x1C, 0x00, 0x3C, 0x00, 0x33, 0x00,
    0x3C, 0x00, 0x3C, 0x00, 0x3C, 0x00, 0x30, 0x00, 0x3C, 0x00, 0x3C, 0x00, 0x3C, 0x00, 0x30, 0x00,
];

/// Random output before the config zone is locked.
const UNLOCKED_RANDOM_PATTERN: [u8; 4] = [0xFF, 0xFF, 0x00, 0x00];

type Reply = Result<Vec<u8>, StatusCode>;

struct TempKey {
    value: [u8; 32],
    /// Loaded verbatim by a pass-through Nonce.
    external: bool,
}

impl Drop for TempKey {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

#[derive(Default)]
struct Faults {
    corrupt_next: Option<u8>,
    drop_next: Option<u8>,
    reject_next: Option<(u8, StatusCode)>,
}

struct SimState {
    config: [u8; CONFIG_ZONE_LEN],
    otp: [u8; OTP_ZONE_LEN],
    data: [[u8; DATA_SLOT_LEN]; DATA_SLOT_COUNT],
    private_keys: [Option<SecretBuffer>; DATA_SLOT_COUNT],
    temp_key: Option<TempKey>,
    rng: StdRng,
    pending: Option<Vec<u8>>,
    opcode_log: Vec<u8>,
    faults: Faults,
    response_timeout_ms: u64,
}

/// Software model of the device, usable anywhere a `Transport` is.
pub struct SimulatedDevice {
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    /// Fresh factory part with the default serial number and an OS-seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(SIM_SERIAL, StdRng::from_entropy())
    }

    /// Fresh factory part with a deterministic RNG.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SIM_SERIAL, StdRng::seed_from_u64(seed))
    }

    /// Fresh factory part with a specific serial number.
    pub fn with_serial(serial: [u8; SERIAL_NUMBER_LEN], seed: u64) -> Self {
        Self::with_rng(serial, StdRng::seed_from_u64(seed))
    }

    fn with_rng(serial: [u8; SERIAL_NUMBER_LEN], rng: StdRng) -> Self {
        let mut config = FACTORY_CONFIG;
        config[0..4].copy_from_slice(&serial[0..4]);
        config[8..13].copy_from_slice(&serial[4..9]);
        Self {
            state: Mutex::new(SimState {
                config,
                otp: [0xFF; OTP_ZONE_LEN],
                data: [[0xFF; DATA_SLOT_LEN]; DATA_SLOT_COUNT],
                private_keys: Default::default(),
                temp_key: None,
                rng,
                pending: None,
                opcode_log: Vec::new(),
                faults: Faults::default(),
                response_timeout_ms: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timeout reported when a read finds no response.
    pub fn set_response_timeout(&self, timeout_ms: u64) {
        self.state().response_timeout_ms = timeout_ms;
    }

    // ------------------------------------------------------------------
    // Inspection and fault injection
    // ------------------------------------------------------------------

    pub fn is_config_locked(&self) -> bool {
        self.state().config_locked()
    }

    pub fn is_data_locked(&self) -> bool {
        self.state().data_locked()
    }

    pub fn config_zone(&self) -> [u8; CONFIG_ZONE_LEN] {
        self.state().config
    }

    pub fn otp_zone(&self) -> [u8; OTP_ZONE_LEN] {
        self.state().otp
    }

    pub fn data_slot(&self, slot: u8) -> [u8; DATA_SLOT_LEN] {
        self.state().data[slot as usize]
    }

    /// Overwrite a config byte directly, bypassing lock rules.
    pub fn set_config_byte(&self, offset: usize, value: u8) {
        self.state().config[offset] = value;
    }

    /// Place a private key in a slot, as if generated on chip.
    pub fn install_private_key(&self, slot: u8, key: &[u8; 32]) {
        self.state().private_keys[slot as usize] = Some(SecretBuffer::from_slice(key));
    }

    /// Opcodes received so far, in order.
    pub fn opcode_log(&self) -> Vec<u8> {
        self.state().opcode_log.clone()
    }

    /// Number of received commands with `opcode`.
    pub fn count_opcode(&self, opcode: u8) -> usize {
        self.state().opcode_log.iter().filter(|&&op| op == opcode).count()
    }

    pub fn clear_opcode_log(&self) {
        self.state().opcode_log.clear();
    }

    /// Execute the next command with `opcode` but flip one bit of its response.
    pub fn corrupt_next_response(&self, opcode: u8) {
        self.state().faults.corrupt_next = Some(opcode);
    }

    /// Execute the next command with `opcode` but lose its response.
    pub fn drop_next_response(&self, opcode: u8) {
        self.state().faults.drop_next = Some(opcode);
    }

    /// Answer the next command with `opcode` with `status` instead of executing it.
    pub fn reject_next(&self, opcode: u8, status: StatusCode) {
        self.state().faults.reject_next = Some((opcode, status));
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Capture the non-volatile contents.
    pub fn snapshot(&self) -> SimSnapshot {
        let state = self.state();
        SimSnapshot {
            config: hex::encode_upper(state.config),
            otp: hex::encode_upper(state.otp),
            data: state.data.iter().map(hex::encode_upper).collect(),
            keys: state
                .private_keys
                .iter()
                .enumerate()
                .filter_map(|(slot, key)| {
                    key.as_ref().map(|k| SimKeyEntry {
                        slot: slot as u8,
                        private_key: hex::encode_upper(k.as_bytes()),
                    })
                })
                .collect(),
        }
    }

    /// Rebuild a device from a snapshot.
    pub fn from_snapshot(snapshot: &SimSnapshot) -> Result<Self, SimImageError> {
        let dev = Self::new();
        {
            let mut state = dev.state();
            decode_into(&snapshot.config, &mut state.config, "config")?;
            decode_into(&snapshot.otp, &mut state.otp, "otp")?;
            if snapshot.data.len() != DATA_SLOT_COUNT {
                return Err(SimImageError::Invalid(format!(
                    "expected {} data slots, found {}",
                    DATA_SLOT_COUNT,
                    snapshot.data.len()
                )));
            }
            for (slot, hex_slot) in snapshot.data.iter().enumerate() {
                decode_into(hex_slot, &mut state.data[slot], "data slot")?;
            }
            for entry in &snapshot.keys {
                if entry.slot as usize >= DATA_SLOT_COUNT {
                    return Err(SimImageError::Invalid(format!(
                        "key slot {} out of range",
                        entry.slot
                    )));
                }
                let mut key = [0u8; 32];
                decode_into(&entry.private_key, &mut key, "private key")?;
                state.private_keys[entry.slot as usize] = Some(SecretBuffer::from_slice(&key));
                key.zeroize();
            }
        }
        Ok(dev)
    }

    /// Load a device image from a TOML file.
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Self, SimImageError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: SimSnapshot = toml::from_str(&content)?;
        Self::from_snapshot(&snapshot)
    }

    /// Save the device image to a TOML file.
    pub fn save_image<P: AsRef<Path>>(&self, path: P) -> Result<(), SimImageError> {
        let content = toml::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_into(src: &str, dst: &mut [u8], what: &str) -> Result<(), SimImageError> {
    hex::decode_to_slice(src, dst)
        .map_err(|e| SimImageError::Invalid(format!("{}: {}", what, e)))
}

/// Errors loading or saving a device image.
#[derive(thiserror::Error, Debug)]
pub enum SimImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Image encode error: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Invalid image: {0}")]
    Invalid(String),
}

/// Serializable non-volatile image of a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub config: String,
    pub otp: String,
    pub data: Vec<String>,
    #[serde(default)]
    pub keys: Vec<SimKeyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimKeyEntry {
    pub slot: u8,
    pub private_key: String,
}

// ----------------------------------------------------------------------
// Command execution
// ----------------------------------------------------------------------

fn is_config_byte_writable(offset: usize) -> bool {
    (16..84).contains(&offset) || (88..CONFIG_ZONE_LEN).contains(&offset)
}

fn derive_public_key(private_key: &[u8]) -> [u8; PUBLIC_KEY_LEN] {
    let mut out = [0u8; PUBLIC_KEY_LEN];
    let x = Sha256::new().chain_update(b"sim-pub-x").chain_update(private_key).finalize();
    let y = Sha256::new().chain_update(b"sim-pub-y").chain_update(private_key).finalize();
    out[..32].copy_from_slice(&x);
    out[32..].copy_from_slice(&y);
    out
}

fn signature_for(public_key: &[u8], digest: &[u8]) -> [u8; SIGNATURE_LEN] {
    let mut out = [0u8; SIGNATURE_LEN];
    let r = Sha256::new()
        .chain_update(b"sim-sig-r")
        .chain_update(public_key)
        .chain_update(digest)
        .finalize();
    let s = Sha256::new()
        .chain_update(b"sim-sig-s")
        .chain_update(public_key)
        .chain_update(digest)
        .finalize();
    out[..32].copy_from_slice(&r);
    out[32..].copy_from_slice(&s);
    out
}

impl SimState {
    fn config_locked(&self) -> bool {
        self.config[CONFIG_LOCK_CONFIG_BYTE] != LOCK_UNLOCKED
    }

    fn data_locked(&self) -> bool {
        self.config[CONFIG_LOCK_VALUE_BYTE] != LOCK_UNLOCKED
    }

    fn random_bytes(&mut self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.rng.fill_bytes(&mut out);
        out
    }

    fn execute(&mut self, frame: &[u8]) -> Reply {
        // | 0x03 | count | opcode | param1 | param2 lo | param2 hi | data | crc |
        if frame.len() < 8 || frame[0] != WORD_ADDRESS_COMMAND {
            return Err(StatusCode::CommError);
        }
        let body = &frame[1..];
        if body[0] as usize != body.len() {
            return Err(StatusCode::CommError);
        }
        let (covered, crc) = body.split_at(body.len() - CRC_LEN);
        if !is_crc_valid(covered, crc) {
            return Err(StatusCode::CommError);
        }

        let opcode = covered[1];
        let param1 = covered[2];
        let param2 = LittleEndian::read_u16(&covered[3..5]);
        let data = &covered[5..];
        self.opcode_log.push(opcode);
        trace!(opcode = %opcode_name(opcode), param1, param2, len = data.len(), "sim command");

        if let Some((op, status)) = self.faults.reject_next {
            if op == opcode {
                self.faults.reject_next = None;
                return Err(status);
            }
        }

        match opcode {
            OP_RANDOM => self.random(param1),
            OP_READ => self.read(param1, param2),
            OP_WRITE => self.write(param1, param2, data),
            OP_LOCK => self.lock(param1, param2),
            OP_NONCE => self.nonce(param1, data),
            OP_GEN_KEY => self.gen_key(param1, param2),
            OP_SIGN => self.sign(param1, param2),
            OP_VERIFY => self.verify(param1, param2, data),
            _ => Err(StatusCode::ParseError),
        }
    }

    fn random(&mut self, mode: u8) -> Reply {
        if mode > RANDOM_MODE_NO_SEED_UPDATE {
            return Err(StatusCode::ParseError);
        }
        if !self.config_locked() {
            return Ok(UNLOCKED_RANDOM_PATTERN.repeat(RANDOM_RSP_LEN / 4));
        }
        Ok(self.random_bytes().to_vec())
    }

    /// Byte range addressed by a read or write, with access checks.
    fn locate(&self, zone: Zone, block: bool, param2: u16) -> Result<(usize, usize), StatusCode> {
        let addr = (param2 & 0xFF) as usize;
        let len = if block { BLOCK_LEN } else { WORD_LEN };
        let (start, zone_len) = match zone {
            Zone::Config => {
                let start = if block { (addr >> 3) * BLOCK_LEN } else { addr * WORD_LEN };
                (start, CONFIG_ZONE_LEN)
            }
            Zone::Otp => {
                let start = if block { (addr >> 3) * BLOCK_LEN } else { addr * WORD_LEN };
                (start, OTP_ZONE_LEN)
            }
            Zone::Data => {
                let slot = (addr >> 3) & 0x0F;
                let word = if block { 0 } else { addr & 0x07 };
                (slot * DATA_SLOT_LEN + word * WORD_LEN, DATA_SLOT_COUNT * DATA_SLOT_LEN)
            }
        };
        if start + len > zone_len {
            return Err(StatusCode::ParseError);
        }
        Ok((start, len))
    }

    fn read(&mut self, param1: u8, param2: u16) -> Reply {
        let zone = Zone::from_mode_bits(param1).ok_or(StatusCode::ParseError)?;
        let (start, len) = self.locate(zone, param1 & MODE_BLOCK_32 != 0, param2)?;
        match zone {
            Zone::Config => Ok(self.config[start..start + len].to_vec()),
            Zone::Otp => {
                if !self.data_locked() {
                    return Err(StatusCode::ExecutionError);
                }
                Ok(self.otp[start..start + len].to_vec())
            }
            Zone::Data => {
                let slot = start / DATA_SLOT_LEN;
                if !self.data_locked() || self.private_keys[slot].is_some() {
                    return Err(StatusCode::ExecutionError);
                }
                let offset = start % DATA_SLOT_LEN;
                Ok(self.data[slot][offset..offset + len].to_vec())
            }
        }
    }

    fn write(&mut self, param1: u8, param2: u16, data: &[u8]) -> Reply {
        let zone = Zone::from_mode_bits(param1).ok_or(StatusCode::ParseError)?;
        let block = param1 & MODE_BLOCK_32 != 0;
        let expected = if block { BLOCK_LEN } else { WORD_LEN };
        if data.len() != expected {
            // MAC-authenticated writes are not modelled.
            return Err(StatusCode::ParseError);
        }
        let (start, len) = self.locate(zone, block, param2)?;
        match zone {
            Zone::Config => {
                if self.config_locked() || !(start..start + len).all(is_config_byte_writable) {
                    return Err(StatusCode::ExecutionError);
                }
                self.config[start..start + len].copy_from_slice(data);
            }
            Zone::Otp => {
                if !self.config_locked() || self.data_locked() {
                    return Err(StatusCode::ExecutionError);
                }
                self.otp[start..start + len].copy_from_slice(data);
            }
            Zone::Data => {
                let slot = start / DATA_SLOT_LEN;
                if !self.config_locked()
                    || self.data_locked()
                    || self.private_keys[slot].is_some()
                {
                    return Err(StatusCode::ExecutionError);
                }
                let offset = start % DATA_SLOT_LEN;
                self.data[slot][offset..offset + len].copy_from_slice(data);
            }
        }
        Ok(vec![StatusCode::Success.to_byte()])
    }

    fn lock(&mut self, param1: u8, summary: u16) -> Reply {
        let check_crc = param1 & LOCK_MODE_IGNORE_CRC == 0;
        match param1 & 0x03 {
            LOCK_ZONE_CONFIG => {
                if self.config_locked() {
                    return Err(StatusCode::ExecutionError);
                }
                if check_crc && crc16(&self.config) != summary {
                    return Err(StatusCode::Miscompare);
                }
                self.config[CONFIG_LOCK_CONFIG_BYTE] = LOCK_LOCKED;
            }
            LOCK_ZONE_DATA_OTP => {
                if !self.config_locked() || self.data_locked() {
                    return Err(StatusCode::ExecutionError);
                }
                if check_crc {
                    let mut image =
                        Vec::with_capacity(DATA_SLOT_COUNT * DATA_SLOT_LEN + OTP_ZONE_LEN);
                    for slot in &self.data {
                        image.extend_from_slice(slot);
                    }
                    image.extend_from_slice(&self.otp);
                    let crc = crc16(&image);
                    image.zeroize();
                    if crc != summary {
                        return Err(StatusCode::Miscompare);
                    }
                }
                self.config[CONFIG_LOCK_VALUE_BYTE] = LOCK_LOCKED;
            }
            _ => return Err(StatusCode::ParseError),
        }
        Ok(vec![StatusCode::Success.to_byte()])
    }

    fn nonce(&mut self, mode: u8, input: &[u8]) -> Reply {
        match mode {
            NONCE_MODE_PASS_THROUGH => {
                if input.len() != NONCE_PASS_THROUGH_INPUT_LEN {
                    return Err(StatusCode::ParseError);
                }
                let mut value = [0u8; 32];
                value.copy_from_slice(input);
                self.temp_key = Some(TempKey { value, external: true });
                Ok(vec![StatusCode::Success.to_byte()])
            }
            NONCE_MODE_RANDOM_UPDATE_SEED | NONCE_MODE_RANDOM_NO_SEED_UPDATE => {
                if input.len() != NONCE_RANDOM_INPUT_LEN {
                    return Err(StatusCode::ParseError);
                }
                let rand = self.random_bytes();
                let digest = Sha256::new()
                    .chain_update(rand)
                    .chain_update(input)
                    .chain_update([OP_NONCE, mode, 0x00])
                    .finalize();
                let mut value = [0u8; 32];
                value.copy_from_slice(&digest);
                self.temp_key = Some(TempKey { value, external: false });
                Ok(rand.to_vec())
            }
            _ => Err(StatusCode::ParseError),
        }
    }

    fn gen_key(&mut self, mode: u8, param2: u16) -> Reply {
        let slot = param2 as usize;
        if slot >= DATA_SLOT_COUNT {
            return Err(StatusCode::ParseError);
        }
        if !self.config_locked() {
            return Err(StatusCode::ExecutionError);
        }
        match mode {
            GENKEY_MODE_PRIVATE => {
                let mut private_key = self.random_bytes();
                let public = derive_public_key(&private_key);
                self.private_keys[slot] = Some(SecretBuffer::from_slice(&private_key));
                private_key.zeroize();
                Ok(public.to_vec())
            }
            GENKEY_MODE_PUBLIC => match &self.private_keys[slot] {
                Some(key) => Ok(derive_public_key(key.as_bytes()).to_vec()),
                None => Err(StatusCode::ExecutionError),
            },
            _ => Err(StatusCode::ParseError),
        }
    }

    fn sign(&mut self, mode: u8, param2: u16) -> Reply {
        let slot = param2 as usize;
        if mode != SIGN_MODE_EXTERNAL || slot >= DATA_SLOT_COUNT {
            return Err(StatusCode::ParseError);
        }
        let temp_key = match self.temp_key.take() {
            Some(tk) if tk.external => tk,
            _ => return Err(StatusCode::ExecutionError),
        };
        let public = match &self.private_keys[slot] {
            Some(key) => derive_public_key(key.as_bytes()),
            None => return Err(StatusCode::ExecutionError),
        };
        Ok(signature_for(&public, &temp_key.value).to_vec())
    }

    fn verify(&mut self, mode: u8, key_type: u16, data: &[u8]) -> Reply {
        if mode != VERIFY_MODE_EXTERNAL
            || key_type != VERIFY_KEY_TYPE_P256
            || data.len() != SIGNATURE_LEN + PUBLIC_KEY_LEN
        {
            return Err(StatusCode::ParseError);
        }
        let temp_key = match self.temp_key.take() {
            Some(tk) if tk.external => tk,
            _ => return Err(StatusCode::ExecutionError),
        };
        let (signature, public) = data.split_at(SIGNATURE_LEN);
        if signature == signature_for(public, &temp_key.value).as_slice() {
            Ok(vec![StatusCode::Success.to_byte()])
        } else {
            Err(StatusCode::Miscompare)
        }
    }
}

impl Transport for SimulatedDevice {
    fn write(&self, frame: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state();
        let reply = state.execute(frame);
        let mut rsp = match &reply {
            Ok(payload) => encode_response(payload),
            Err(status) => encode_status(*status),
        };
        if let Err(status) = reply {
            debug!(status = %status, "sim rejected command");
        }
        let opcode = frame.get(2).copied();
        if opcode.is_some() && state.faults.corrupt_next == opcode {
            state.faults.corrupt_next = None;
            let last = rsp.len() - 1;
            rsp[last] ^= 0x01;
        }
        if opcode.is_some() && state.faults.drop_next == opcode {
            state.faults.drop_next = None;
            rsp.zeroize();
            state.pending = None;
        } else {
            state.pending = Some(rsp);
        }
        Ok(frame.len())
    }

    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        match state.pending.take() {
            Some(rsp) if rsp.len() <= max_len => Ok(rsp),
            Some(rsp) => Err(TransportError::ReadFailed(format!(
                "response of {} bytes exceeds buffer of {}",
                rsp.len(),
                max_len
            ))),
            None => Err(TransportError::Timeout {
                timeout_ms: state.response_timeout_ms,
            }),
        }
    }

    fn wait(&self, _exec_time: Duration) {}

    fn is_connected(&self) -> bool {
        true
    }
}
