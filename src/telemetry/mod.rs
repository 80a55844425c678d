//! Read-only view of live simulator state.
//!
//! A [`TelemetrySnapshot`] is captured once per simulation step through a
//! [`TelemetrySource`]. The default source, [`TelemetryAccessor`], reads
//! from an explicit [`SimulatorConnection`](crate::simulator::SimulatorConnection)
//! handle; there is no ambient global connection.

pub mod accessor;
pub mod error;
pub mod snapshot;

pub use accessor::{TelemetryAccessor, TelemetrySource};
pub use error::TelemetryError;
pub use snapshot::{TelemetrySnapshot, VehicleTelemetry};
