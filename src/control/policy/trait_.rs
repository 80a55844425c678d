//! Policy trait for signal control.

use std::path::Path;

use crate::artifact::ArtifactError;
use crate::simulator::PhaseAction;

/// A policy that selects a signal phase from an observation.
pub trait Policy {
    /// Selects an action for the current observation.
    ///
    /// # Arguments
    ///
    /// * `observation` - Observation returned by the last reset/step
    /// * `deterministic` - Take the most likely action instead of sampling
    fn predict(&mut self, observation: &[f64], deterministic: bool) -> PhaseAction;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}

/// Loads a trained policy from a persisted model artifact.
///
/// The artifact format is owned by the learning collaborator and is opaque
/// here.
pub trait PolicyLoader {
    type Policy: Policy;

    fn load(&self, path: &Path) -> Result<Self::Policy, ArtifactError>;
}
