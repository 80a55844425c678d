//! corridor - priority-aware signal control harness
//!
//! Reward shaping, episode evaluation, and checkpoint selection for a
//! traffic-signal controller that must clear a path for one emergency
//! vehicle while keeping ordinary traffic moving.
//!
//! The traffic simulator and the learning algorithm are external
//! collaborators, reached through the traits in [`simulator`] and
//! [`control`].

pub mod artifact;
pub mod config;
pub mod control;
pub mod evaluation;
pub mod simulator;
pub mod telemetry;
pub mod units;

pub use artifact::{ArtifactError, ArtifactSelector, ModelArtifact, ModelResolver};
pub use config::{RewardConfig, RunConfig};
pub use control::{Policy, RewardShaper};
pub use evaluation::{
    EpisodeDriver, EpisodeOutcome, EvaluationSummary, LifecycleTracker, ResultRecord,
    TerminationPolicy, WaitingTimeLedger,
};
pub use simulator::{Environment, PhaseAction, SimulatorConnection, SimulatorSession};
pub use telemetry::{TelemetryAccessor, TelemetryError, TelemetrySnapshot, TelemetrySource};

/// Identifier the simulator assigns to a vehicle.
///
/// Unique while the vehicle is on the network; may be reused in a later
/// episode.
pub type VehicleId = String;

/// Generates a new unique run identifier (UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
