//! Priority-aware reward shaping.
//!
//! Converts per-step telemetry into a single scalar training signal that
//! trades civilian throughput against emergency-vehicle priority.

use tracing::warn;

use crate::config::RewardConfig;
use crate::telemetry::{TelemetryError, TelemetrySnapshot, TelemetrySource};

/// Computes the shaped reward for a training step.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardShaper {
    config: RewardConfig,
}

impl RewardShaper {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Computes the reward for one step.
    ///
    /// `reward = -(w × Σ lane_wait + Σ_stalled_emergency stall_penalty)`
    ///
    /// # Components
    ///
    /// 1. **Civilian penalty**: sum of accumulated waiting time over the
    ///    controlled lanes, scaled by `civilian_weight`.
    /// 2. **Emergency penalty**: `stall_penalty` for every vehicle of the
    ///    emergency type moving slower than `stall_speed`.
    pub fn reward(&self, snapshot: &TelemetrySnapshot) -> f64 {
        self.reward_with_lane_weights(snapshot, None)
    }

    /// Like [`RewardShaper::reward`], with an extra per-lane weight applied
    /// to each lane's waiting time before summation. Lanes without a weight
    /// use 1.0.
    pub fn reward_with_lane_weights(
        &self,
        snapshot: &TelemetrySnapshot,
        lane_weights: Option<&[f64]>,
    ) -> f64 {
        let civilian = self.civilian_penalty(&snapshot.per_lane_accumulated_wait, lane_weights);
        let emergency = self.emergency_penalty(snapshot);
        self.combine(civilian, emergency)
    }

    /// Reward from a snapshot read that may have failed.
    ///
    /// A failed vehicle lookup never fails the training step: the emergency
    /// penalty falls back to 0 and the civilian penalty is taken from
    /// `lane_waits`, or 0 if that read fails too.
    pub fn reward_or_default<F>(
        &self,
        snapshot: Result<&TelemetrySnapshot, &TelemetryError>,
        lane_waits: F,
    ) -> f64
    where
        F: FnOnce() -> Result<Vec<f64>, TelemetryError>,
    {
        match snapshot {
            Ok(snapshot) => self.reward(snapshot),
            Err(err) => {
                warn!(error = %err, "emergency lookup failed; stall penalty set to 0");
                let civilian = match lane_waits() {
                    Ok(waits) => self.civilian_penalty(&waits, None),
                    Err(err) => {
                        warn!(error = %err, "lane waits unavailable; civilian penalty set to 0");
                        0.0
                    }
                };
                self.combine(civilian, 0.0)
            }
        }
    }

    /// Reads the current step from `source` and shapes it.
    pub fn reward_from_source<S: TelemetrySource + ?Sized>(&self, source: &S) -> f64 {
        let snapshot = source.snapshot();
        self.reward_or_default(snapshot.as_ref(), || source.lane_waits())
    }

    /// Weighted sum of lane waiting times. Non-finite entries are skipped.
    pub fn civilian_penalty(&self, lane_waits: &[f64], lane_weights: Option<&[f64]>) -> f64 {
        lane_waits
            .iter()
            .enumerate()
            .map(|(i, wait)| {
                let weight = lane_weights.and_then(|w| w.get(i)).copied().unwrap_or(1.0);
                wait * weight
            })
            .filter(|v| v.is_finite())
            .sum()
    }

    /// Stall penalty summed over slow emergency vehicles.
    pub fn emergency_penalty(&self, snapshot: &TelemetrySnapshot) -> f64 {
        let stalled = snapshot
            .vehicles_of_type(&self.config.emergency_type)
            .filter(|id| {
                snapshot
                    .speed(id)
                    .is_some_and(|speed| speed < self.config.stall_speed)
            })
            .count();
        stalled as f64 * self.config.stall_penalty
    }

    fn combine(&self, civilian: f64, emergency: f64) -> f64 {
        let reward = -(self.config.civilian_weight * civilian + emergency);
        if reward.is_finite() {
            reward
        } else {
            f64::MIN
        }
    }
}

impl Default for RewardShaper {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::VehicleTelemetry;

    fn ambulance(speed: f64) -> VehicleTelemetry {
        VehicleTelemetry::new("hero_ambulance", "ambulance_type", speed, 0.0)
    }

    #[test]
    fn empty_snapshot_is_zero() {
        let shaper = RewardShaper::default();
        assert_eq!(shaper.reward(&TelemetrySnapshot::new(0.0)), 0.0);
    }

    #[test]
    fn civilian_penalty_is_lane_sum() {
        let shaper = RewardShaper::default();
        let s = TelemetrySnapshot::new(5.0).with_lane_waits(vec![10.0, 5.0]);
        assert!((shaper.reward(&s) + 15.0).abs() < 1e-10);
    }

    #[test]
    fn stalled_ambulance_costs_exactly_the_penalty() {
        let shaper = RewardShaper::new(RewardConfig {
            stall_penalty: 5000.0,
            ..RewardConfig::default()
        });
        let lanes = vec![3.0, 4.0];
        let moving = TelemetrySnapshot::new(1.0)
            .with_vehicle(ambulance(1.0))
            .with_lane_waits(lanes.clone());
        let stalled = TelemetrySnapshot::new(1.0)
            .with_vehicle(ambulance(0.99))
            .with_lane_waits(lanes);
        let diff = shaper.reward(&moving) - shaper.reward(&stalled);
        assert!((diff - 5000.0).abs() < 1e-10);
    }

    #[test]
    fn only_emergency_type_is_penalized() {
        let shaper = RewardShaper::default();
        let s = TelemetrySnapshot::new(1.0)
            .with_vehicle(VehicleTelemetry::new("bus_1", "bus", 0.0, 40.0));
        assert_eq!(shaper.emergency_penalty(&s), 0.0);
    }

    #[test]
    fn every_stalled_emergency_vehicle_counts() {
        let shaper = RewardShaper::default();
        let s = TelemetrySnapshot::new(1.0)
            .with_vehicle(ambulance(0.0))
            .with_vehicle(VehicleTelemetry::new("amb_2", "ambulance_type", 0.3, 0.0));
        assert_eq!(shaper.emergency_penalty(&s), 2.0 * shaper.config().stall_penalty);
    }

    #[test]
    fn civilian_weight_scales_lane_penalty() {
        let shaper = RewardShaper::new(RewardConfig {
            civilian_weight: 0.7,
            ..RewardConfig::default()
        });
        let s = TelemetrySnapshot::new(1.0).with_lane_waits(vec![10.0]);
        assert!((shaper.reward(&s) + 7.0).abs() < 1e-10);
    }

    #[test]
    fn per_lane_weights_default_to_one() {
        let shaper = RewardShaper::default();
        let s = TelemetrySnapshot::new(1.0).with_lane_waits(vec![10.0, 10.0, 10.0]);
        let r = shaper.reward_with_lane_weights(&s, Some(&[0.5, 2.0]));
        assert!((r + 35.0).abs() < 1e-10);
    }

    #[test]
    fn non_finite_lane_values_are_skipped() {
        let shaper = RewardShaper::default();
        let s = TelemetrySnapshot::new(1.0).with_lane_waits(vec![f64::NAN, 2.0, f64::INFINITY]);
        assert!((shaper.reward(&s) + 2.0).abs() < 1e-10);
    }

    #[test]
    fn failed_lookup_defaults_emergency_to_zero() {
        let shaper = RewardShaper::default();
        let err = TelemetryError::Unavailable("not running".into());
        let r = shaper.reward_or_default(Err(&err), || Ok(vec![1.0, 2.0]));
        assert!((r + 3.0).abs() < 1e-10);
    }

    #[test]
    fn failed_lookup_and_lanes_is_zero() {
        let shaper = RewardShaper::default();
        let err = TelemetryError::Unavailable("not running".into());
        let r = shaper.reward_or_default(Err(&err), || Err(err.clone()));
        assert_eq!(r, 0.0);
    }
}
