//! ECC key generation, signing and verification.
//!
//! Keys and signatures cross the chip boundary in the device's native
//! 64-byte `X || Y` / `R || S` form.

use std::fmt;

use thiserror::Error;
use tracing::{info, instrument};

use crate::device::Device;
use crate::error::{EcletError, Result};
use crate::protocol::constants::*;
use crate::protocol::{Command, StatusCode};
use crate::transport::Transport;

/// Tag byte of an uncompressed SEC1 point.
pub const UNCOMPRESSED_POINT_TAG: u8 = 0x04;
pub const UNCOMPRESSED_POINT_LEN: usize = PUBLIC_KEY_LEN + 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("Expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("Expected point tag 0x04, got 0x{0:02X}")]
    Tag(u8),
}

/// P-256 public key in device-native form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, KeyFormatError> {
        let raw: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| KeyFormatError::Length {
            expected: PUBLIC_KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// SEC1 uncompressed encoding: `0x04 || X || Y`.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_POINT_LEN] {
        let mut out = [0u8; UNCOMPRESSED_POINT_LEN];
        out[0] = UNCOMPRESSED_POINT_TAG;
        out[1..].copy_from_slice(&self.0);
        out
    }

    /// Parse a SEC1 uncompressed point, reading `X || Y` from a sub-slice.
    pub fn from_uncompressed(point: &[u8]) -> std::result::Result<Self, KeyFormatError> {
        match point.split_first() {
            Some((&UNCOMPRESSED_POINT_TAG, xy)) if point.len() == UNCOMPRESSED_POINT_LEN => {
                Self::from_bytes(xy)
            }
            Some((&tag, _)) if point.len() == UNCOMPRESSED_POINT_LEN => {
                Err(KeyFormatError::Tag(tag))
            }
            _ => Err(KeyFormatError::Length {
                expected: UNCOMPRESSED_POINT_LEN,
                actual: point.len(),
            }),
        }
    }

    /// Accept either the native 64-byte form or the 65-byte uncompressed form.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, KeyFormatError> {
        if bytes.len() == UNCOMPRESSED_POINT_LEN {
            Self::from_uncompressed(bytes)
        } else {
            Self::from_bytes(bytes)
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

/// ECDSA signature as `R || S`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, KeyFormatError> {
        let raw: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| KeyFormatError::Length {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

fn check_slot(slot: u8) {
    assert!(
        (slot as usize) < DATA_SLOT_COUNT,
        "key slot {} out of range (max {})",
        slot,
        DATA_SLOT_COUNT - 1
    );
}

impl<T: Transport> Device<T> {
    /// Create a private key in `slot` (`want_private`), or recompute the
    /// public key of the one already there, and return the public key.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a data slot.
    #[instrument(skip(self))]
    pub fn generate_key(&mut self, slot: u8, want_private: bool) -> Result<PublicKey> {
        check_slot(slot);
        let mode = if want_private {
            GENKEY_MODE_PRIVATE
        } else {
            GENKEY_MODE_PUBLIC
        };
        let cmd = Command::new(OP_GEN_KEY, mode, slot as u16).with_exec_time(GEN_KEY_EXEC);
        let rsp = self.execute(cmd, PUBLIC_KEY_LEN)?;
        if want_private {
            info!(slot, "Generated private key");
        }
        PublicKey::from_bytes(&rsp).map_err(|e| EcletError::Invariant(e.to_string()))
    }

    /// Public key of the private key held in `slot`.
    pub fn public_key(&mut self, slot: u8) -> Result<PublicKey> {
        self.generate_key(slot, false)
    }

    /// Sign the digest loaded by the preceding `load_nonce` with the key in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a data slot.
    #[instrument(skip(self))]
    pub fn sign(&mut self, slot: u8) -> Result<Signature> {
        check_slot(slot);
        if !self.is_digest_loaded() {
            return Err(EcletError::Precondition(
                "sign requires a digest loaded by the immediately preceding nonce".into(),
            ));
        }
        let cmd = Command::new(OP_SIGN, SIGN_MODE_EXTERNAL, slot as u16).with_exec_time(SIGN_EXEC);
        let rsp = self.execute(cmd, SIGNATURE_LEN)?;
        Signature::from_bytes(&rsp).map_err(|e| EcletError::Invariant(e.to_string()))
    }

    /// Verify `signature` over the loaded digest against `public_key`.
    ///
    /// `Ok(false)` only for an explicit miscompare from the device; every
    /// other failure is an error.
    #[instrument(skip_all)]
    pub fn verify(&mut self, public_key: &PublicKey, signature: &Signature) -> Result<bool> {
        if !self.is_digest_loaded() {
            return Err(EcletError::Precondition(
                "verify requires a digest loaded by the immediately preceding nonce".into(),
            ));
        }
        let mut data = Vec::with_capacity(SIGNATURE_LEN + PUBLIC_KEY_LEN);
        data.extend_from_slice(signature.as_bytes());
        data.extend_from_slice(public_key.as_bytes());

        let cmd = Command::new(OP_VERIFY, VERIFY_MODE_EXTERNAL, VERIFY_KEY_TYPE_P256)
            .with_data(&data)?
            .with_exec_time(VERIFY_EXEC);
        match self.execute_status(cmd) {
            Ok(()) => Ok(true),
            Err(EcletError::DeviceRejected {
                status: StatusCode::Miscompare,
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Load `digest` and sign it with the key in `slot`.
    pub fn sign_digest(&mut self, slot: u8, digest: &[u8]) -> Result<Signature> {
        self.load_nonce(digest)?;
        self.sign(slot)
    }

    /// Load `digest` and verify `signature` over it.
    pub fn verify_digest(
        &mut self,
        digest: &[u8],
        public_key: &PublicKey,
        signature: &Signature,
    ) -> Result<bool> {
        self.load_nonce(digest)?;
        self.verify(public_key, signature)
    }
}
