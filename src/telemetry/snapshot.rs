//! Per-step telemetry values.

use std::collections::{BTreeMap, BTreeSet};

use crate::VehicleId;

/// Telemetry for a single vehicle at one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTelemetry {
    /// Simulator-assigned vehicle ID.
    pub id: VehicleId,
    /// Vehicle type ID (e.g. `"ambulance_type"`).
    pub type_id: String,
    /// Current speed in m/s.
    pub speed: f64,
    /// Accumulated waiting time in seconds.
    pub waiting_time: f64,
}

impl VehicleTelemetry {
    /// Creates telemetry for one vehicle.
    pub fn new(
        id: impl Into<VehicleId>,
        type_id: impl Into<String>,
        speed: f64,
        waiting_time: f64,
    ) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            speed,
            waiting_time,
        }
    }
}

/// Immutable value captured once per simulation step.
///
/// Maps are ordered so two snapshots read from the same simulator state
/// compare equal regardless of the order in which the backend listed its
/// vehicles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// Simulated time in seconds (monotonically non-decreasing).
    pub sim_time: f64,
    /// Vehicles currently on the network.
    pub active_vehicle_ids: BTreeSet<VehicleId>,
    /// Waiting time (s) per active vehicle.
    pub per_vehicle_waiting_time: BTreeMap<VehicleId, f64>,
    /// Speed (m/s) per active vehicle.
    pub per_vehicle_speed: BTreeMap<VehicleId, f64>,
    /// Vehicle type ID per active vehicle.
    pub per_vehicle_type_id: BTreeMap<VehicleId, String>,
    /// Accumulated waiting time per controlled lane, in lane order.
    pub per_lane_accumulated_wait: Vec<f64>,
}

impl TelemetrySnapshot {
    /// Creates an empty snapshot at the given simulated time.
    pub fn new(sim_time: f64) -> Self {
        Self {
            sim_time,
            ..Self::default()
        }
    }

    /// Builder-style variant of [`TelemetrySnapshot::insert_vehicle`].
    pub fn with_vehicle(mut self, vehicle: VehicleTelemetry) -> Self {
        self.insert_vehicle(vehicle);
        self
    }

    /// Sets the per-lane accumulated waiting times.
    pub fn with_lane_waits(mut self, lane_waits: Vec<f64>) -> Self {
        self.per_lane_accumulated_wait = lane_waits;
        self
    }

    /// Records a vehicle as active with the given telemetry.
    pub fn insert_vehicle(&mut self, vehicle: VehicleTelemetry) {
        let VehicleTelemetry {
            id,
            type_id,
            speed,
            waiting_time,
        } = vehicle;
        self.per_vehicle_waiting_time.insert(id.clone(), waiting_time);
        self.per_vehicle_speed.insert(id.clone(), speed);
        self.per_vehicle_type_id.insert(id.clone(), type_id);
        self.active_vehicle_ids.insert(id);
    }

    /// Returns true if the vehicle is on the network at this step.
    pub fn contains(&self, id: &str) -> bool {
        self.active_vehicle_ids.contains(id)
    }

    /// Number of vehicles on the network.
    pub fn vehicle_count(&self) -> usize {
        self.active_vehicle_ids.len()
    }

    pub fn waiting_time(&self, id: &str) -> Option<f64> {
        self.per_vehicle_waiting_time.get(id).copied()
    }

    pub fn speed(&self, id: &str) -> Option<f64> {
        self.per_vehicle_speed.get(id).copied()
    }

    pub fn type_id(&self, id: &str) -> Option<&str> {
        self.per_vehicle_type_id.get(id).map(String::as_str)
    }

    /// Iterates over active vehicles of the given type.
    pub fn vehicles_of_type<'a>(
        &'a self,
        type_id: &'a str,
    ) -> impl Iterator<Item = &'a VehicleId> + 'a {
        self.active_vehicle_ids
            .iter()
            .filter(move |id| self.type_id(id) == Some(type_id))
    }

    /// Iterates over active vehicles other than the privileged one.
    pub fn civilians<'a>(
        &'a self,
        privileged_id: &'a str,
    ) -> impl Iterator<Item = &'a VehicleId> + 'a {
        self.active_vehicle_ids
            .iter()
            .filter(move |id| id.as_str() != privileged_id)
    }
}
