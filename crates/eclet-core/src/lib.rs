//! Eclet-Core: protocol and lifecycle engine for ECC secure element chips.
//!
//! Drives a discrete secure element (key storage, RNG, P-256 sign/verify)
//! over a byte-oriented command/response bus.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Command framing, CRC-16, response parsing, constants
//! - **Zone**: Config/OTP/Data addressing
//! - **Transport**: Bus abstraction (simulated device, scripted mock)
//! - **Device**: Exclusive handle issuing commands and tracking session state
//! - **State**: Lifecycle derived from lock bits, zone locking
//! - **Nonce / ECC**: Digest loading, key generation, sign and verify
//! - **Personalize**: Factory to personalized provisioning workflow
//! - **Events**: Observer pattern for UI decoupling
//!
//! # Example
//!
//! ```
//! use eclet_core::{Device, DeviceState, PersonalizeOptions, SimulatedDevice};
//!
//! let mut device = Device::new(SimulatedDevice::with_seed(1));
//! let report = device
//!     .personalize(DeviceState::Personalized, &PersonalizeOptions::default())
//!     .unwrap();
//! assert!(report.reached_goal());
//!
//! let public_key = device.generate_key(0, true).unwrap();
//! let signature = device.sign_digest(0, &[0xAA; 32]).unwrap();
//! assert!(device.verify_digest(&[0xAA; 32], &public_key, &signature).unwrap());
//! ```

pub mod config;
pub mod config_zone;
pub mod device;
pub mod ecc;
pub mod error;
pub mod events;
pub mod nonce;
pub mod personalize;
pub mod protocol;
pub mod secret;
pub mod state;
pub mod transport;
pub mod zone;

// Re-exports for convenience
pub use config::EcletConfig;
pub use config_zone::ConfigTemplate;
pub use device::Device;
pub use ecc::{KeyFormatError, PublicKey, Signature};
pub use error::{EcletError, Result};
pub use events::{
    EcletEvent, EcletObserver, LogLevel, NullObserver, PersonalizeStep, RecordingObserver,
    TracingObserver,
};
pub use personalize::{PersonalizeFailure, PersonalizeOptions, PersonalizeReport};
pub use protocol::{Command, StatusCode};
pub use secret::{KeyContainer, SecretBuffer};
pub use state::{DeviceState, LockChecksum};
pub use transport::{MockTransport, SimSnapshot, SimulatedDevice, Transport, TransportError};
pub use zone::{Zone, slot_to_address, zone_mode_bits};
