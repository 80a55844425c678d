//! Read-only query surface of a live simulator.

use std::fmt;

use crate::telemetry::TelemetryError;
use crate::VehicleId;

/// Lifecycle of a simulator connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created but not yet reset.
    NotStarted,
    /// Reset and accepting steps.
    Running,
    /// Released; no further queries are answered.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::NotStarted => write!(f, "not started"),
            ConnectionState::Running => write!(f, "running"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Queries answered by a running simulator.
///
/// Mirrors the subset of the simulator's control interface the harness
/// needs: vehicle listing, per-vehicle waiting time/speed/type, simulated
/// time, lane waiting time for the controlled signal, and edge halting
/// counts. None of these calls may change simulator state.
pub trait SimulatorConnection {
    fn state(&self) -> ConnectionState;

    /// Current simulated time in seconds.
    fn sim_time(&self) -> Result<f64, TelemetryError>;

    /// IDs of all vehicles currently on the network.
    fn vehicle_ids(&self) -> Result<Vec<VehicleId>, TelemetryError>;

    fn vehicle_waiting_time(&self, id: &str) -> Result<f64, TelemetryError>;

    fn vehicle_speed(&self, id: &str) -> Result<f64, TelemetryError>;

    fn vehicle_type(&self, id: &str) -> Result<String, TelemetryError>;

    /// Accumulated waiting time per lane controlled by the agent's signal.
    fn lane_accumulated_waits(&self) -> Result<Vec<f64>, TelemetryError>;

    fn edge_halting_number(&self, edge_id: &str) -> Result<u32, TelemetryError>;

    /// Vehicles on the network plus those still waiting to be inserted.
    fn min_expected_vehicles(&self) -> Result<u32, TelemetryError>;
}
