//! Random policy for testing and baselines.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;
use crate::simulator::PhaseAction;

/// Uniformly random phase selection.
///
/// Selects a phase from `[0, n_phases)` on every step, ignoring the
/// observation and the `deterministic` flag. Used for sanity checks and as a
/// lower-bound baseline. With zero phases it falls back to the fixed-time
/// program.
#[derive(Debug)]
pub struct RandomPolicy {
    n_phases: usize,
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a new random policy seeded from entropy.
    pub fn new(n_phases: usize) -> Self {
        Self {
            n_phases,
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a reproducible random policy.
    pub fn seeded(n_phases: usize, seed: u64) -> Self {
        Self {
            n_phases,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn predict(&mut self, _observation: &[f64], _deterministic: bool) -> PhaseAction {
        if self.n_phases == 0 {
            return PhaseAction::FixedTime;
        }
        PhaseAction::Select(self.rng.gen_range(0..self.n_phases))
    }

    fn name(&self) -> &str {
        "random"
    }
}
