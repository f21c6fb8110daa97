//! Transport layer module.

pub mod mock;
pub mod sim;
pub mod traits;

pub use mock::MockTransport;
pub use sim::{SimImageError, SimSnapshot, SimulatedDevice};
pub use traits::{Transport, TransportError};
