use thiserror::Error;

use crate::VehicleId;

/// Errors raised while reading simulator telemetry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The simulator connection is not in a running state, or the backend
    /// refused the query.
    #[error("Telemetry unavailable: {0}")]
    Unavailable(String),

    /// The vehicle left the network between listing and querying it.
    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(VehicleId),
}
