//! Event system for UI decoupling.
//!
//! Lets a CLI or other front end follow command traffic and the
//! personalization workflow without coupling to the core logic.

use std::fmt;

use crate::protocol::opcode_name;
use crate::state::DeviceState;
use crate::zone::Zone;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Steps of the personalization workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalizeStep {
    /// Writing the config zone template.
    WriteConfig,
    /// Locking the config zone.
    LockConfig,
    /// Checking the OTP mode byte.
    CheckOtpMode,
    /// Writing the OTP identification blocks.
    WriteOtp,
    /// Writing data slot keys.
    WriteKeys,
    /// Locking the data/OTP zones.
    LockData,
}

impl fmt::Display for PersonalizeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonalizeStep::WriteConfig => write!(f, "Write Config"),
            PersonalizeStep::LockConfig => write!(f, "Lock Config"),
            PersonalizeStep::CheckOtpMode => write!(f, "Check OTP Mode"),
            PersonalizeStep::WriteOtp => write!(f, "Write OTP"),
            PersonalizeStep::WriteKeys => write!(f, "Write Keys"),
            PersonalizeStep::LockData => write!(f, "Lock Data"),
        }
    }
}

/// Events emitted by a device handle.
#[derive(Debug, Clone)]
pub enum EcletEvent {
    /// Lifecycle state derived from the lock bits.
    StateObserved { state: DeviceState },
    /// A personalization step began.
    StepStarted { step: PersonalizeStep },
    /// A personalization step finished.
    StepCompleted { step: PersonalizeStep },
    /// A personalization step failed; the workflow stops here.
    StepFailed { step: PersonalizeStep, message: String },
    /// A Lock command succeeded.
    ZoneLocked { zone: Zone },
    /// Frame sent or received. Payload bytes are never carried.
    Packet {
        direction: PacketDirection,
        opcode: u8,
        length: usize,
    },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Bus frame direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Host -> Device
    Rx, // Device -> Host
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving device events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait EcletObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &EcletEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl EcletObserver for NullObserver {
    fn on_event(&self, _event: &EcletEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl EcletObserver for TracingObserver {
    fn on_event(&self, event: &EcletEvent) {
        match event {
            EcletEvent::StateObserved { state } => {
                tracing::debug!(state = %state, "State observed");
            }
            EcletEvent::StepStarted { step } => {
                tracing::info!(step = %step, "Step started");
            }
            EcletEvent::StepCompleted { step } => {
                tracing::debug!(step = %step, "Step completed");
            }
            EcletEvent::StepFailed { step, message } => {
                tracing::warn!(step = %step, "Step failed: {}", message);
            }
            EcletEvent::ZoneLocked { zone } => {
                tracing::info!(zone = %zone, "Zone locked");
            }
            EcletEvent::Packet {
                direction,
                opcode,
                length,
            } => {
                tracing::trace!(
                    dir = %direction,
                    opcode = %opcode_name(*opcode),
                    len = length,
                    "Frame"
                );
            }
            EcletEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}

/// Observer that records every event, for tests and scripted front ends.
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<EcletEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EcletEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl EcletObserver for RecordingObserver {
    fn on_event(&self, event: &EcletEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
