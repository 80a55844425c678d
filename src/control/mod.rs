//! Training-side control: reward shaping and action-selection policies.
//!
//! The learning algorithm itself is an external collaborator. This module
//! provides what the harness hands to it ([`RewardShaper`]) and what the
//! harness consumes from it ([`Policy`], loaded through [`PolicyLoader`]),
//! plus two baselines that need no training.

pub mod policy;
pub mod reward;

pub use crate::simulator::PhaseAction;
pub use policy::{FixedTimePolicy, Policy, PolicyLoader, RandomPolicy};
pub use reward::RewardShaper;
