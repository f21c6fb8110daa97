//! Owned secret buffers.
//!
//! Nonce, digest and key material live in `SecretBuffer`, whose contents are
//! overwritten before the memory is released.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::protocol::constants::{DATA_SLOT_COUNT, DATA_SLOT_LEN};

/// Heap buffer wiped on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer(Vec<u8>);

impl SecretBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for SecretBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SecretBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer({} bytes, redacted)", self.0.len())
    }
}

/// Per-slot keys burned into the data zone during personalization.
#[derive(Default)]
pub struct KeyContainer {
    keys: [Option<SecretBuffer>; DATA_SLOT_COUNT],
}

impl KeyContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a 32-byte key for `slot`, replacing (and wiping) any previous key.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range or the key is not 32 bytes.
    pub fn set(&mut self, slot: u8, key: SecretBuffer) {
        assert!((slot as usize) < DATA_SLOT_COUNT, "slot {} out of range", slot);
        assert_eq!(key.len(), DATA_SLOT_LEN, "keys are {} bytes", DATA_SLOT_LEN);
        self.keys[slot as usize] = Some(key);
    }

    pub fn get(&self, slot: u8) -> Option<&SecretBuffer> {
        self.keys.get(slot as usize).and_then(|k| k.as_ref())
    }

    /// Present keys in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &SecretBuffer)> {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.as_ref().map(|k| (i as u8, k)))
    }

    pub fn len(&self) -> usize {
        self.keys.iter().filter(|k| k.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The data zone image these keys produce, zero-filled elsewhere.
    pub fn data_zone_image(&self) -> SecretBuffer {
        let mut image = SecretBuffer::zeroed(DATA_SLOT_COUNT * DATA_SLOT_LEN);
        for (slot, key) in self.iter() {
            let start = slot as usize * DATA_SLOT_LEN;
            image.as_mut_bytes()[start..start + DATA_SLOT_LEN].copy_from_slice(key.as_bytes());
        }
        image
    }
}

impl fmt::Debug for KeyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<u8> = self.iter().map(|(s, _)| s).collect();
        f.debug_struct("KeyContainer").field("slots", &slots).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroize_clears_contents() {
        let mut buf = SecretBuffer::from_slice(&[0xAA; 32]);
        buf.zeroize();
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_debug_is_redacted() {
        let buf = SecretBuffer::from_slice(&[0xAB; 4]);
        assert_eq!(format!("{:?}", buf), "SecretBuffer(4 bytes, redacted)");
    }

    #[test]
    fn test_key_container() {
        let mut keys = KeyContainer::new();
        assert!(keys.is_empty());

        keys.set(3, SecretBuffer::from_slice(&[0x33; 32]));
        keys.set(0, SecretBuffer::from_slice(&[0x01; 32]));
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.iter().map(|(s, _)| s).collect::<Vec<_>>(), vec![0, 3]);
        assert!(keys.get(1).is_none());

        let image = keys.data_zone_image();
        assert_eq!(image.len(), 512);
        assert_eq!(&image.as_bytes()[..32], &[0x01; 32]);
        assert_eq!(&image.as_bytes()[96..128], &[0x33; 32]);
        assert!(image.as_bytes()[32..96].iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic]
    fn test_key_container_rejects_short_key() {
        KeyContainer::new().set(0, SecretBuffer::from_slice(&[0; 16]));
    }
}
