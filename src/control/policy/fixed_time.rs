//! Fixed-time baseline.

use super::trait_::Policy;
use crate::simulator::PhaseAction;

/// Never intervenes; the signal keeps running its fixed-time program.
///
/// Used as the comparison baseline for trained controllers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTimePolicy;

impl Policy for FixedTimePolicy {
    fn predict(&mut self, _observation: &[f64], _deterministic: bool) -> PhaseAction {
        PhaseAction::FixedTime
    }

    fn name(&self) -> &str {
        "fixed-time"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_fixed_time() {
        let mut policy = FixedTimePolicy;
        assert_eq!(policy.predict(&[1.0, 2.0], true), PhaseAction::FixedTime);
        assert_eq!(policy.predict(&[], false), PhaseAction::FixedTime);
        assert_eq!(policy.name(), "fixed-time");
    }
}
