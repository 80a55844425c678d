//! Privileged-vehicle lifecycle tracking.
//!
//! ```text
//! NotSeen --(id appears)--> Active { entry } --(id disappears)--> Finished { entry, exit }
//! ```
//!
//! `Finished` is terminal for the episode: a later reappearance of the same
//! ID does not reopen tracking.

use crate::telemetry::TelemetrySnapshot;
use crate::units::{seconds, Seconds};
use crate::VehicleId;

/// Lifecycle state of the privileged vehicle within one episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleState {
    NotSeen,
    Active { entry_time: f64 },
    Finished { entry_time: f64, exit_time: f64 },
}

/// Transition reported by [`LifecycleTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleEvent {
    Entered { time: f64 },
    Exited { time: f64, transit: f64 },
}

/// Tracks when the privileged vehicle enters and leaves the network.
#[derive(Debug, Clone)]
pub struct LifecycleTracker {
    privileged_id: VehicleId,
    state: LifecycleState,
}

impl LifecycleTracker {
    pub fn new(privileged_id: impl Into<VehicleId>) -> Self {
        Self {
            privileged_id: privileged_id.into(),
            state: LifecycleState::NotSeen,
        }
    }

    /// Feeds one step's snapshot; returns the transition it caused, if any.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot) -> Option<LifecycleEvent> {
        let present = snapshot.contains(&self.privileged_id);
        match self.state {
            LifecycleState::NotSeen if present => {
                self.state = LifecycleState::Active {
                    entry_time: snapshot.sim_time,
                };
                Some(LifecycleEvent::Entered {
                    time: snapshot.sim_time,
                })
            }
            LifecycleState::Active { entry_time } if !present => {
                let exit_time = snapshot.sim_time;
                self.state = LifecycleState::Finished {
                    entry_time,
                    exit_time,
                };
                Some(LifecycleEvent::Exited {
                    time: exit_time,
                    transit: exit_time - entry_time,
                })
            }
            _ => None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn privileged_id(&self) -> &str {
        &self.privileged_id
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, LifecycleState::Finished { .. })
    }

    pub fn entry_time(&self) -> Option<f64> {
        match self.state {
            LifecycleState::NotSeen => None,
            LifecycleState::Active { entry_time } | LifecycleState::Finished { entry_time, .. } => {
                Some(entry_time)
            }
        }
    }

    pub fn exit_time(&self) -> Option<f64> {
        match self.state {
            LifecycleState::Finished { exit_time, .. } => Some(exit_time),
            _ => None,
        }
    }

    /// Exit time minus entry time, once the vehicle has finished.
    ///
    /// `None` while the vehicle has not spawned or is still on the network;
    /// never coerced to zero.
    pub fn transit_duration(&self) -> Option<f64> {
        match self.state {
            LifecycleState::Finished {
                entry_time,
                exit_time,
            } => Some(exit_time - entry_time),
            _ => None,
        }
    }

    /// [`LifecycleTracker::transit_duration`] as a typed quantity.
    pub fn transit(&self) -> Option<Seconds> {
        self.transit_duration().map(seconds)
    }
}
