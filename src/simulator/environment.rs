//! Control-loop contract of the simulator collaborator.
//!
//! Step results come in two shapes depending on the collaborator's
//! version: the legacy `(observation, reward, done, info)` and the newer
//! `(observation, reward, terminated, truncated, info)`. [`RawStep`] holds
//! either form and [`RawStep::normalize`] folds both into one
//! [`Transition`] with `done = terminated || truncated`.

use std::collections::BTreeMap;

use super::connection::SimulatorConnection;
use super::error::SimulatorError;

/// Free-form numeric diagnostics attached to a step.
pub type StepInfo = BTreeMap<String, f64>;

/// Signal control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseAction {
    /// Leave the signal on its fixed-time program.
    FixedTime,
    /// Switch to the phase with this index.
    Select(usize),
}

/// Value returned by `reset`, with or without an info map.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutput {
    Observation(Vec<f64>),
    WithInfo(Vec<f64>, StepInfo),
}

impl ResetOutput {
    /// Drops the info map, if any.
    pub fn into_observation(self) -> Vec<f64> {
        match self {
            ResetOutput::Observation(obs) | ResetOutput::WithInfo(obs, _) => obs,
        }
    }
}

/// Step result as produced by the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStep {
    /// `(observation, reward, done, info)`
    Legacy {
        observation: Vec<f64>,
        reward: f64,
        done: bool,
        info: StepInfo,
    },
    /// `(observation, reward, terminated, truncated, info)`
    Split {
        observation: Vec<f64>,
        reward: f64,
        terminated: bool,
        truncated: bool,
        info: StepInfo,
    },
}

impl RawStep {
    pub fn normalize(self) -> Transition {
        match self {
            RawStep::Legacy {
                observation,
                reward,
                done,
                info,
            } => Transition {
                observation,
                reward,
                done,
                truncated: false,
                info,
            },
            RawStep::Split {
                observation,
                reward,
                terminated,
                truncated,
                info,
            } => Transition {
                observation,
                reward,
                done: terminated || truncated,
                truncated,
                info,
            },
        }
    }
}

/// Normalized step result seen by the episode driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Vec<f64>,
    /// Reward reported by the collaborator (not the shaped reward).
    pub reward: f64,
    /// Episode ended, for any reason.
    pub done: bool,
    /// Episode ended because of a time limit rather than a terminal state.
    pub truncated: bool,
    pub info: StepInfo,
}

/// Reset/step control loop of the simulator.
///
/// `close` releases the underlying simulator process and must be safe to
/// call more than once.
pub trait Environment {
    type Connection: SimulatorConnection;

    fn reset(&mut self) -> Result<ResetOutput, SimulatorError>;

    fn step(&mut self, action: PhaseAction) -> Result<RawStep, SimulatorError>;

    /// Read-only connection used for telemetry after each step.
    fn connection(&self) -> &Self::Connection;

    fn close(&mut self);
}
