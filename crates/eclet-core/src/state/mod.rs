//! Lifecycle state module.

pub mod machine;

pub use machine::{DeviceState, LockChecksum};
