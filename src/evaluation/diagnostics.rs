//! Late-spawn diagnostics for the privileged vehicle.
//!
//! When the privileged vehicle is overdue, the usual cause is a blocked
//! entry edge: it is loaded but cannot be inserted. Periodic reports of
//! the insertion backlog and the halting count on the entry edge make that
//! visible.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PriorityConfig;
use crate::telemetry::{TelemetrySnapshot, TelemetrySource};
use crate::VehicleId;

/// State of the network at one overdue check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpawnReport {
    pub step: u64,
    pub sim_time: f64,
    pub on_road: usize,
    /// Loaded vehicles still waiting for insertion.
    pub pending: u32,
    /// Halted vehicles on the privileged vehicle's entry edge.
    pub entry_edge_halting: u32,
}

/// Watches for an overdue privileged vehicle.
#[derive(Debug, Clone)]
pub struct SpawnDiagnostics {
    privileged_id: VehicleId,
    expected_spawn_time: f64,
    entry_edge: String,
    every_steps: u64,
    seen: bool,
}

impl SpawnDiagnostics {
    pub fn new(privileged_id: impl Into<VehicleId>, entry_edge: impl Into<String>) -> Self {
        Self {
            privileged_id: privileged_id.into(),
            expected_spawn_time: 120.0,
            entry_edge: entry_edge.into(),
            every_steps: 10,
            seen: false,
        }
    }

    pub fn from_config(config: &PriorityConfig) -> Self {
        Self::new(&config.privileged_id, &config.entry_edge)
            .with_expected_spawn_time(config.expected_spawn_time)
    }

    pub fn with_expected_spawn_time(mut self, time: f64) -> Self {
        self.expected_spawn_time = time;
        self
    }

    /// Report every `steps` steps while overdue. 0 disables reporting.
    pub fn with_every_steps(mut self, steps: u64) -> Self {
        self.every_steps = steps;
        self
    }

    pub fn has_spawned(&self) -> bool {
        self.seen
    }

    /// Forgets the previous episode.
    pub fn reset(&mut self) {
        self.seen = false;
    }

    /// Checks one step. Returns a report if the privileged vehicle is
    /// overdue and a report is due on this step.
    ///
    /// Extra reads from `source` are limited to the backlog and the entry
    /// edge; if either fails the check is skipped for this step.
    pub fn inspect<S: TelemetrySource + ?Sized>(
        &mut self,
        step: u64,
        snapshot: &TelemetrySnapshot,
        source: &S,
    ) -> Option<SpawnReport> {
        if self.seen {
            return None;
        }
        if snapshot.contains(&self.privileged_id) {
            self.seen = true;
            info!(
                vehicle = %self.privileged_id,
                sim_time = snapshot.sim_time,
                "privileged vehicle spawned"
            );
            return None;
        }
        if snapshot.sim_time < self.expected_spawn_time
            || self.every_steps == 0
            || step % self.every_steps != 0
        {
            return None;
        }

        let pending = source.pending_vehicles();
        let halting = source.edge_halting_number(&self.entry_edge);
        let (pending, entry_edge_halting) = match (pending, halting) {
            (Ok(p), Ok(h)) => (p, h),
            (Err(err), _) | (_, Err(err)) => {
                warn!(step, error = %err, "spawn diagnostics unavailable");
                return None;
            }
        };

        let report = SpawnReport {
            step,
            sim_time: snapshot.sim_time,
            on_road: snapshot.vehicle_count(),
            pending,
            entry_edge_halting,
        };
        warn!(
            vehicle = %self.privileged_id,
            sim_time = report.sim_time,
            on_road = report.on_road,
            pending = report.pending,
            edge = %self.entry_edge,
            halting = report.entry_edge_halting,
            "privileged vehicle overdue"
        );
        Some(report)
    }
}
