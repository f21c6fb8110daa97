//! Verb implementations. Results go to stdout as uppercase hex.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use eclet_core::{
    Device, DeviceState, EcletConfig, KeyContainer, PersonalizeOptions, PublicKey, SecretBuffer,
    Signature, Transport,
};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{DeviceVerb, Goal};

/// Parse `SLOT:HEX` into a slot number and 32 key bytes.
pub fn parse_slot_key(s: &str) -> std::result::Result<(u8, Vec<u8>), String> {
    let (slot, key) = s
        .split_once(':')
        .ok_or_else(|| "expected SLOT:HEX".to_string())?;
    let slot: u8 = slot.parse().map_err(|e| format!("bad slot: {}", e))?;
    if slot > 15 {
        return Err(format!("slot {} out of range (0-15)", slot));
    }
    let key = hex::decode(key).map_err(|e| format!("bad key hex: {}", e))?;
    if key.len() != 32 {
        return Err(format!("key must be 32 bytes, got {}", key.len()));
    }
    Ok((slot, key))
}

/// SHA-256 of a file, or of stdin when no file is given.
pub fn sha256_input(file: Option<&Path>) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut reader: Box<dyn Read> = match file {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    io::copy(&mut reader, &mut hasher).context("hashing input")?;
    Ok(hasher.finalize().into())
}

fn print_hex(bytes: &[u8]) {
    println!("{}", hex::encode_upper(bytes));
}

/// Print the SHA-256 of a file or stdin. Needs no device.
pub(crate) fn hash(file: Option<&Path>) -> Result<()> {
    print_hex(&sha256_input(file)?);
    Ok(())
}

pub(crate) fn dispatch<T: Transport>(
    device: &mut Device<T>,
    config: &EcletConfig,
    verb: DeviceVerb,
) -> Result<()> {
    match verb {
        DeviceVerb::Random { update_seed } => print_hex(&device.random(update_seed)?),
        DeviceVerb::SerialNum => print_hex(&device.serial_number()?),
        DeviceVerb::State => println!("{}", device.current_state()?),
        DeviceVerb::GetConfig => print_hex(&device.config_zone()?),
        DeviceVerb::GetOtp => print_hex(&device.otp_zone()?),
        DeviceVerb::Personalize { goal, keys } => personalize(device, config, goal, keys)?,
        DeviceVerb::Nonce => print_hex(&device.get_nonce()?),
        DeviceVerb::GenKey { slot } => {
            check_slot(slot)?;
            println!("{}", device.generate_key(slot, true)?);
        }
        DeviceVerb::GetPub { slot } => {
            check_slot(slot)?;
            println!("{}", device.public_key(slot)?);
        }
        DeviceVerb::Sign { slot, file } => {
            check_slot(slot)?;
            let digest = sha256_input(file.as_deref())?;
            println!("{}", device.sign_digest(slot, &digest)?);
        }
        DeviceVerb::Verify {
            pub_key,
            signature,
            file,
        } => {
            let public_key =
                PublicKey::parse(&hex::decode(pub_key.trim()).context("public key hex")?)?;
            let signature =
                Signature::from_bytes(&hex::decode(signature.trim()).context("signature hex")?)?;
            let digest = sha256_input(file.as_deref())?;
            if !device.verify_digest(&digest, &public_key, &signature)? {
                bail!("signature does not verify");
            }
            println!("Verified");
        }
    }
    Ok(())
}

fn check_slot(slot: u8) -> Result<()> {
    if slot > 15 {
        bail!("slot {} out of range (0-15)", slot);
    }
    Ok(())
}

fn personalize<T: Transport>(
    device: &mut Device<T>,
    config: &EcletConfig,
    goal: Goal,
    keys: Vec<(u8, Vec<u8>)>,
) -> Result<()> {
    let goal = match goal {
        Goal::Initialized => DeviceState::Initialized,
        Goal::Personalized => DeviceState::Personalized,
    };

    let mut opts = PersonalizeOptions::from(config);
    if !keys.is_empty() {
        let mut container = KeyContainer::new();
        for (slot, key) in keys {
            container.set(slot, SecretBuffer::new(key));
        }
        opts.keys = Some(container);
    }

    let report = device.personalize(goal, &opts)?;
    println!("{}", report.state);
    if let Some(failure) = report.failure {
        return Err(anyhow::Error::new(failure.error)
            .context(format!("personalization failed at step '{}'", failure.step)));
    }
    if !report.reached_goal() {
        bail!("device reached {} but {} was requested", report.state, goal);
    }
    info!(state = %report.state, "Personalization complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slot_key() {
        let hex_key = "AB".repeat(32);
        let (slot, key) = parse_slot_key(&format!("3:{}", hex_key)).unwrap();
        assert_eq!(slot, 3);
        assert_eq!(key, vec![0xAB; 32]);

        assert!(parse_slot_key("16:00").is_err());
        assert!(parse_slot_key("1:ABCD").is_err());
        assert!(parse_slot_key("nocolon").is_err());
    }

    #[test]
    fn test_sha256_of_file() {
        let path = std::env::temp_dir().join(format!("eclet-hash-{}.bin", std::process::id()));
        std::fs::write(&path, b"abc").unwrap();
        let digest = sha256_input(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            hex::encode_upper(digest),
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
    }
}
