//! Configuration for simulation runs, reward shaping, and training.
//!
//! [`RunConfig`] bundles everything one training or evaluation run needs.
//! The presets reproduce the three deployed setups: the fixed-time
//! baseline, the standard PPO agent, and the optimized agent.

use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::CheckpointNaming;
use crate::evaluation::TerminationPolicy;
use crate::VehicleId;

/// Errors raised by configuration validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Field {0} must not be empty")]
    Empty(&'static str),

    #[error("Stall penalty {stall_penalty} does not dominate queue penalty (needs >= {required})")]
    WeakStallPenalty { stall_penalty: f64, required: f64 },
}

/// Reward shaping parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RewardConfig {
    /// Penalty per emergency vehicle moving slower than `stall_speed`.
    pub stall_penalty: f64,
    /// Scale applied to the summed lane waiting time.
    pub civilian_weight: f64,
    /// Speed (m/s) below which an emergency vehicle counts as stalled.
    pub stall_speed: f64,
    /// Vehicle type ID of emergency vehicles.
    pub emergency_type: String,
}

impl RewardConfig {
    /// Minimum ratio between the stall penalty and the weighted reference
    /// queue penalty accepted by [`RewardConfig::check_dominance`].
    pub const DOMINANCE_RATIO: f64 = 10.0;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stall_penalty.is_finite() || self.stall_penalty <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "stall_penalty",
                value: self.stall_penalty,
            });
        }
        if !self.civilian_weight.is_finite() || self.civilian_weight < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "civilian_weight",
                value: self.civilian_weight,
            });
        }
        if !self.stall_speed.is_finite() || self.stall_speed <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "stall_speed",
                value: self.stall_speed,
            });
        }
        if self.emergency_type.is_empty() {
            return Err(ConfigError::Empty("emergency_type"));
        }
        Ok(())
    }

    /// Checks that one stalled emergency vehicle outweighs a typical
    /// per-step queue penalty by at least an order of magnitude.
    ///
    /// # Arguments
    ///
    /// * `reference_queue_penalty` - Summed lane waiting time of a typical
    ///   congested step, before weighting
    pub fn check_dominance(&self, reference_queue_penalty: f64) -> Result<(), ConfigError> {
        let required = Self::DOMINANCE_RATIO * self.civilian_weight * reference_queue_penalty;
        if self.stall_penalty >= required {
            Ok(())
        } else {
            Err(ConfigError::WeakStallPenalty {
                stall_penalty: self.stall_penalty,
                required,
            })
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            stall_penalty: 1000.0,
            civilian_weight: 1.0,
            stall_speed: 1.0,
            emergency_type: "ambulance_type".into(),
        }
    }
}

/// Parameters handed to the simulator collaborator when it is started.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    pub net_file: PathBuf,
    /// Route files, loaded in order (vehicle types first).
    pub route_files: Vec<PathBuf>,
    /// Episode length in simulated seconds.
    pub num_seconds: u32,
    pub yellow_time: u32,
    pub min_green: u32,
    pub max_green: u32,
    pub use_gui: bool,
    /// Run the signal on its fixed-time program instead of agent control.
    pub fixed_ts: bool,
}

impl SimulationConfig {
    /// Route files joined with commas, as the simulator's command line expects.
    pub fn route_arg(&self) -> String {
        self.route_files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            net_file: "draft02.net.xml".into(),
            route_files: vec![
                "vtypes.rou.xml".into(),
                "draft02.rou.xml".into(),
                "ambulance.rou.xml".into(),
            ],
            num_seconds: 600,
            yellow_time: 4,
            min_green: 5,
            max_green: 60,
            use_gui: false,
            fixed_ts: false,
        }
    }
}

/// Identity and expected arrival of the privileged vehicle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PriorityConfig {
    pub privileged_id: VehicleId,
    /// Scheduled departure time (s); spawn diagnostics start after it.
    pub expected_spawn_time: f64,
    /// Edge on which the privileged vehicle enters the network.
    pub entry_edge: String,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            privileged_id: "hero_ambulance".into(),
            expected_spawn_time: 120.0,
            entry_edge: "-E2".into(),
        }
    }
}

/// Hyperparameters handed to the external PPO optimizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrainingConfig {
    pub learning_rate: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// GAE λ parameter.
    pub gae_lambda: f64,
    /// PPO clip parameter ε.
    pub clip_range: f64,
    /// Entropy bonus coefficient.
    pub ent_coef: f64,
    /// Rollout length per update.
    pub n_steps: u32,
    pub batch_size: u32,
    pub total_timesteps: u64,
    /// Save a checkpoint every this many steps (`None` = final model only).
    pub checkpoint_every: Option<u64>,
    /// Checkpoint file name prefix.
    pub checkpoint_prefix: String,
}

impl TrainingConfig {
    /// Returns true if a checkpoint should be written after `step`.
    pub fn checkpoint_due(&self, step: u64) -> bool {
        match self.checkpoint_every {
            Some(every) if every > 0 => step > 0 && step % every == 0,
            _ => false,
        }
    }

    /// Path of the checkpoint written after `step`, if one is due.
    pub fn checkpoint_path(
        &self,
        dir: &Path,
        step: u64,
        naming: &CheckpointNaming,
    ) -> Option<PathBuf> {
        self.checkpoint_due(step)
            .then(|| dir.join(naming.file_name(&self.checkpoint_prefix, step)))
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            ent_coef: 0.0,
            n_steps: 2048,
            batch_size: 256,
            total_timesteps: 100_000,
            checkpoint_every: None,
            checkpoint_prefix: "rl_model".into(),
        }
    }
}

/// Where trained models and their normalization statistics live.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArtifactConfig {
    /// Named final model, without the `.zip` extension.
    pub default_model: PathBuf,
    pub checkpoint_dir: PathBuf,
    /// Primary observation-normalization statistics file, if the policy
    /// was trained with normalized observations.
    pub normalization_stats: Option<PathBuf>,
    /// Checkpoints carrying this name segment are preferred.
    pub preferred_tag: Option<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            default_model: "my_traffic_agent".into(),
            checkpoint_dir: "models".into(),
            normalization_stats: None,
            preferred_tag: None,
        }
    }
}

/// Complete configuration of one run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub reward: RewardConfig,
    pub priority: PriorityConfig,
    pub termination: TerminationPolicy,
    pub training: TrainingConfig,
    pub artifacts: ArtifactConfig,
    /// Two-line result file written at the end of an evaluation run.
    pub result_path: PathBuf,
    /// Log progress every this many steps (0 disables).
    pub progress_every: u64,
}

impl RunConfig {
    /// Fixed-time baseline: no agent, stop once the privileged vehicle is out.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig {
                fixed_ts: true,
                ..SimulationConfig::default()
            },
            termination: TerminationPolicy {
                max_steps: Some(1000),
                stop_on_privileged_finish: true,
            },
            result_path: "baseline_result.txt".into(),
            ..Self::standard()
        }
    }

    /// Standard PPO agent: stall penalty 1000, unweighted lane penalty.
    pub fn standard() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            reward: RewardConfig::default(),
            priority: PriorityConfig::default(),
            termination: TerminationPolicy::default(),
            training: TrainingConfig::default(),
            artifacts: ArtifactConfig::default(),
            result_path: "agent_result.txt".into(),
            progress_every: 20,
        }
    }

    /// Optimized agent: heavier stall penalty, down-weighted lane penalty,
    /// longer episodes, periodic checkpoints.
    pub fn optimized() -> Self {
        Self {
            simulation: SimulationConfig {
                num_seconds: 1000,
                ..SimulationConfig::default()
            },
            reward: RewardConfig {
                stall_penalty: 5000.0,
                civilian_weight: 0.7,
                ..RewardConfig::default()
            },
            termination: TerminationPolicy {
                max_steps: None,
                stop_on_privileged_finish: true,
            },
            training: TrainingConfig {
                gamma: 0.995,
                ent_coef: 0.01,
                batch_size: 64,
                checkpoint_every: Some(10_000),
                checkpoint_prefix: "rl_model_optimized".into(),
                ..TrainingConfig::default()
            },
            artifacts: ArtifactConfig {
                default_model: "optimized_traffic_agent".into(),
                checkpoint_dir: "modelsop".into(),
                normalization_stats: Some("vec_normalize.pkl".into()),
                preferred_tag: Some("optimized".into()),
            },
            result_path: "optimized_result.txt".into(),
            ..Self::standard()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reward.validate()?;
        if self.priority.privileged_id.is_empty() {
            return Err(ConfigError::Empty("privileged_id"));
        }
        if self.simulation.num_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "num_seconds",
                value: 0.0,
            });
        }
        if self.termination.max_steps == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_steps",
                value: 0.0,
            });
        }
        if self.simulation.min_green > self.simulation.max_green {
            return Err(ConfigError::InvalidValue {
                field: "min_green",
                value: self.simulation.min_green as f64,
            });
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::standard()
    }
}
