//! Scripted simulator driven by recorded frames.
//!
//! Each call to `step` advances to the next [`ReplayFrame`]; the episode is
//! done once the last frame is reached. Used to exercise the harness without
//! an external simulator process, and to inject telemetry or backend
//! failures at chosen steps.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::connection::{ConnectionState, SimulatorConnection};
use super::environment::{Environment, PhaseAction, RawStep, ResetOutput, StepInfo};
use super::error::SimulatorError;
use crate::telemetry::{TelemetryError, VehicleTelemetry};
use crate::VehicleId;

/// Simulator state at one recorded step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayFrame {
    pub sim_time: f64,
    pub vehicles: Vec<VehicleTelemetry>,
    pub lane_waits: Vec<f64>,
    pub halting: BTreeMap<String, u32>,
    /// Vehicles on the network plus pending insertions. Defaults to the
    /// number of vehicles on the network.
    pub expected: Option<u32>,
}

impl ReplayFrame {
    pub fn new(sim_time: f64) -> Self {
        Self {
            sim_time,
            ..Self::default()
        }
    }

    pub fn vehicle(mut self, vehicle: VehicleTelemetry) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn lanes(mut self, lane_waits: Vec<f64>) -> Self {
        self.lane_waits = lane_waits;
        self
    }

    pub fn halting(mut self, edge_id: impl Into<String>, count: u32) -> Self {
        self.halting.insert(edge_id.into(), count);
        self
    }

    pub fn expected(mut self, count: u32) -> Self {
        self.expected = Some(count);
        self
    }

    fn find(&self, id: &str) -> Result<&VehicleTelemetry, TelemetryError> {
        self.vehicles
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| TelemetryError::UnknownVehicle(id.to_string()))
    }
}

/// Tuple shape the replay simulator reports from `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepShape {
    #[default]
    Legacy,
    Split,
}

/// Counts how many times a [`ReplaySimulator`] was closed, observable after
/// the simulator has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Frame-by-frame scripted simulator.
#[derive(Debug)]
pub struct ReplaySimulator {
    frames: Vec<ReplayFrame>,
    cursor: usize,
    steps_taken: u64,
    state: ConnectionState,
    shape: StepShape,
    reset_with_info: bool,
    telemetry_failures: BTreeSet<u64>,
    fail_step_at: Option<u64>,
    actions: Vec<PhaseAction>,
    closes: CloseCounter,
}

impl ReplaySimulator {
    pub fn new(frames: Vec<ReplayFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            steps_taken: 0,
            state: ConnectionState::NotStarted,
            shape: StepShape::default(),
            reset_with_info: false,
            telemetry_failures: BTreeSet::new(),
            fail_step_at: None,
            actions: Vec::new(),
            closes: CloseCounter::default(),
        }
    }

    pub fn with_shape(mut self, shape: StepShape) -> Self {
        self.shape = shape;
        self
    }

    /// Makes `reset` return `(observation, info)` instead of a bare observation.
    pub fn with_reset_info(mut self) -> Self {
        self.reset_with_info = true;
        self
    }

    /// Vehicle queries fail with [`TelemetryError::Unavailable`] after the
    /// given step (1-based). Lane queries keep working.
    pub fn fail_telemetry_at(mut self, step: u64) -> Self {
        self.telemetry_failures.insert(step);
        self
    }

    /// The given step (1-based) fails with a backend error.
    pub fn fail_step_at(mut self, step: u64) -> Self {
        self.fail_step_at = Some(step);
        self
    }

    pub fn close_counter(&self) -> CloseCounter {
        self.closes.clone()
    }

    /// Actions received since the last reset.
    pub fn actions(&self) -> &[PhaseAction] {
        &self.actions
    }

    fn frame(&self) -> Result<&ReplayFrame, TelemetryError> {
        if self.state != ConnectionState::Running {
            return Err(TelemetryError::Unavailable(format!(
                "replay connection is {}",
                self.state
            )));
        }
        self.frames
            .get(self.cursor)
            .ok_or_else(|| TelemetryError::Unavailable("no frame loaded".into()))
    }

    fn vehicle_frame(&self) -> Result<&ReplayFrame, TelemetryError> {
        if self.telemetry_failures.contains(&self.steps_taken) {
            return Err(TelemetryError::Unavailable(format!(
                "injected failure at step {}",
                self.steps_taken
            )));
        }
        self.frame()
    }

    fn observation(&self) -> Vec<f64> {
        self.frames
            .get(self.cursor)
            .map(|f| f.lane_waits.clone())
            .unwrap_or_default()
    }
}

impl SimulatorConnection for ReplaySimulator {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn sim_time(&self) -> Result<f64, TelemetryError> {
        Ok(self.frame()?.sim_time)
    }

    fn vehicle_ids(&self) -> Result<Vec<VehicleId>, TelemetryError> {
        Ok(self
            .vehicle_frame()?
            .vehicles
            .iter()
            .map(|v| v.id.clone())
            .collect())
    }

    fn vehicle_waiting_time(&self, id: &str) -> Result<f64, TelemetryError> {
        Ok(self.vehicle_frame()?.find(id)?.waiting_time)
    }

    fn vehicle_speed(&self, id: &str) -> Result<f64, TelemetryError> {
        Ok(self.vehicle_frame()?.find(id)?.speed)
    }

    fn vehicle_type(&self, id: &str) -> Result<String, TelemetryError> {
        Ok(self.vehicle_frame()?.find(id)?.type_id.clone())
    }

    fn lane_accumulated_waits(&self) -> Result<Vec<f64>, TelemetryError> {
        Ok(self.frame()?.lane_waits.clone())
    }

    fn edge_halting_number(&self, edge_id: &str) -> Result<u32, TelemetryError> {
        Ok(self.frame()?.halting.get(edge_id).copied().unwrap_or(0))
    }

    fn min_expected_vehicles(&self) -> Result<u32, TelemetryError> {
        let frame = self.frame()?;
        Ok(frame.expected.unwrap_or(frame.vehicles.len() as u32))
    }
}

impl Environment for ReplaySimulator {
    type Connection = Self;

    fn reset(&mut self) -> Result<ResetOutput, SimulatorError> {
        if self.frames.is_empty() {
            return Err(SimulatorError::Backend("replay has no frames".into()));
        }
        self.state = ConnectionState::Running;
        self.cursor = 0;
        self.steps_taken = 0;
        self.actions.clear();

        let observation = self.observation();
        Ok(if self.reset_with_info {
            ResetOutput::WithInfo(observation, StepInfo::new())
        } else {
            ResetOutput::Observation(observation)
        })
    }

    fn step(&mut self, action: PhaseAction) -> Result<RawStep, SimulatorError> {
        if self.state != ConnectionState::Running {
            return Err(SimulatorError::NotRunning(self.state));
        }
        self.steps_taken += 1;
        if self.fail_step_at == Some(self.steps_taken) {
            return Err(SimulatorError::Backend(format!(
                "injected failure at step {}",
                self.steps_taken
            )));
        }
        self.actions.push(action);

        let last = self.frames.len() - 1;
        self.cursor = (self.cursor + 1).min(last);
        let done = self.cursor == last;

        let observation = self.observation();
        let reward = -observation.iter().sum::<f64>();
        let mut info = StepInfo::new();
        info.insert("step".into(), self.steps_taken as f64);

        Ok(match self.shape {
            StepShape::Legacy => RawStep::Legacy {
                observation,
                reward,
                done,
                info,
            },
            StepShape::Split => RawStep::Split {
                observation,
                reward,
                terminated: false,
                truncated: done,
                info,
            },
        })
    }

    fn connection(&self) -> &Self::Connection {
        self
    }

    fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.closes.0.fetch_add(1, Ordering::SeqCst);
    }
}
