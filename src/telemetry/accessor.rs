//! Telemetry accessor over an explicit simulator connection.

use super::error::TelemetryError;
use super::snapshot::{TelemetrySnapshot, VehicleTelemetry};
use crate::simulator::{ConnectionState, SimulatorConnection};

/// Source of per-step telemetry.
///
/// Implementations must not mutate simulator state. Reading twice without
/// an intervening simulator step yields identical values.
pub trait TelemetrySource {
    /// Captures the full per-step snapshot.
    fn snapshot(&self) -> Result<TelemetrySnapshot, TelemetryError>;

    /// Accumulated waiting time per controlled lane.
    ///
    /// Readable on its own so the reward can still account for queued
    /// traffic when per-vehicle lookups fail.
    fn lane_waits(&self) -> Result<Vec<f64>, TelemetryError>;

    /// Number of halted vehicles on an edge during the last step.
    fn edge_halting_number(&self, edge_id: &str) -> Result<u32, TelemetryError>;

    /// Vehicles loaded into the simulation but not yet on the network.
    fn pending_vehicles(&self) -> Result<u32, TelemetryError>;
}

/// Read-only facade over a [`SimulatorConnection`].
///
/// Borrows the connection for the duration of one step; create a new
/// accessor after each simulator step.
#[derive(Debug)]
pub struct TelemetryAccessor<'a, C: SimulatorConnection + ?Sized> {
    connection: &'a C,
}

impl<'a, C: SimulatorConnection + ?Sized> TelemetryAccessor<'a, C> {
    pub fn new(connection: &'a C) -> Self {
        Self { connection }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &'a C {
        self.connection
    }

    fn ensure_running(&self) -> Result<(), TelemetryError> {
        match self.connection.state() {
            ConnectionState::Running => Ok(()),
            state => Err(TelemetryError::Unavailable(format!(
                "connection is {}",
                state
            ))),
        }
    }
}

impl<C: SimulatorConnection + ?Sized> TelemetrySource for TelemetryAccessor<'_, C> {
    fn snapshot(&self) -> Result<TelemetrySnapshot, TelemetryError> {
        self.ensure_running()?;
        let conn = self.connection;

        let mut snapshot = TelemetrySnapshot::new(conn.sim_time()?);
        for id in conn.vehicle_ids()? {
            let vehicle = VehicleTelemetry {
                type_id: conn.vehicle_type(&id)?,
                speed: conn.vehicle_speed(&id)?,
                waiting_time: conn.vehicle_waiting_time(&id)?,
                id,
            };
            snapshot.insert_vehicle(vehicle);
        }
        snapshot.per_lane_accumulated_wait = conn.lane_accumulated_waits()?;
        Ok(snapshot)
    }

    fn lane_waits(&self) -> Result<Vec<f64>, TelemetryError> {
        self.ensure_running()?;
        self.connection.lane_accumulated_waits()
    }

    fn edge_halting_number(&self, edge_id: &str) -> Result<u32, TelemetryError> {
        self.ensure_running()?;
        self.connection.edge_halting_number(edge_id)
    }

    fn pending_vehicles(&self) -> Result<u32, TelemetryError> {
        self.ensure_running()?;
        let expected = self.connection.min_expected_vehicles()?;
        let on_road = self.connection.vehicle_ids()?.len();
        Ok(expected.saturating_sub(on_road as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::replay::{ReplayFrame, ReplaySimulator};
    use crate::simulator::{Environment, PhaseAction};

    fn frames() -> Vec<ReplayFrame> {
        vec![
            ReplayFrame::new(0.0),
            ReplayFrame::new(1.0)
                .vehicle(VehicleTelemetry::new("car_1", "passenger", 3.0, 0.0))
                .vehicle(VehicleTelemetry::new("hero_ambulance", "ambulance_type", 0.2, 1.0))
                .lanes(vec![2.0, 0.5])
                .halting("-E2", 4)
                .expected(5),
        ]
    }

    #[test]
    fn snapshot_reads_all_fields() {
        let mut sim = ReplaySimulator::new(frames());
        sim.reset().unwrap();
        sim.step(PhaseAction::Select(0)).unwrap();

        let snapshot = TelemetryAccessor::new(sim.connection()).snapshot().unwrap();
        assert_eq!(snapshot.sim_time, 1.0);
        assert_eq!(snapshot.vehicle_count(), 2);
        assert_eq!(snapshot.speed("hero_ambulance"), Some(0.2));
        assert_eq!(snapshot.per_lane_accumulated_wait, vec![2.0, 0.5]);
    }

    #[test]
    fn repeated_reads_are_identical() {
        let mut sim = ReplaySimulator::new(frames());
        sim.reset().unwrap();
        sim.step(PhaseAction::FixedTime).unwrap();

        let accessor = TelemetryAccessor::new(sim.connection());
        let first = accessor.snapshot().unwrap();
        let second = accessor.snapshot().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn not_running_is_unavailable() {
        let sim = ReplaySimulator::new(frames());
        let err = TelemetryAccessor::new(sim.connection())
            .snapshot()
            .unwrap_err();
        assert!(matches!(err, TelemetryError::Unavailable(_)));
    }

    #[test]
    fn closed_connection_is_unavailable() {
        let mut sim = ReplaySimulator::new(frames());
        sim.reset().unwrap();
        sim.close();
        let accessor = TelemetryAccessor::new(sim.connection());
        assert!(matches!(
            accessor.lane_waits(),
            Err(TelemetryError::Unavailable(_))
        ));
    }

    #[test]
    fn pending_and_halting_counts() {
        let mut sim = ReplaySimulator::new(frames());
        sim.reset().unwrap();
        sim.step(PhaseAction::FixedTime).unwrap();

        let accessor = TelemetryAccessor::new(sim.connection());
        assert_eq!(accessor.pending_vehicles().unwrap(), 3);
        assert_eq!(accessor.edge_halting_number("-E2").unwrap(), 4);
        assert_eq!(accessor.edge_halting_number("E9").unwrap(), 0);
    }
}
