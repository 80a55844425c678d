//! Episode driver.
//!
//! Each loop iteration performs exactly one simulator step followed by
//! exactly one telemetry snapshot, which is fed to both the lifecycle
//! tracker and the waiting-time ledger. The loop blocks on every simulator
//! call; there is no overlap between stepping and bookkeeping.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::diagnostics::{SpawnDiagnostics, SpawnReport};
use super::error::EpisodeError;
use super::lifecycle::{LifecycleEvent, LifecycleTracker};
use super::outcome::EpisodeOutcome;
use super::waiting::WaitingTimeLedger;
use crate::config::RunConfig;
use crate::control::{Policy, RewardShaper};
use crate::simulator::{Environment, SimulatorSession};
use crate::telemetry::TelemetrySource;
use crate::VehicleId;

/// When an episode stops, besides the environment's own done signal.
///
/// The default runs until the environment reports done. Stopping as soon
/// as the privileged vehicle finishes is opt-in: such episodes stop
/// logging civilian waits early and are not comparable with full-length
/// ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TerminationPolicy {
    /// Step-count ceiling.
    pub max_steps: Option<u64>,
    pub stop_on_privileged_finish: bool,
}

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// The environment reported done (terminated or truncated).
    Done,
    StepCeiling,
    PrivilegedFinished,
}

impl TerminationPolicy {
    pub fn run_to_completion() -> Self {
        Self::default()
    }

    /// Returns the reason to stop after `steps` steps, if any.
    ///
    /// The done signal takes precedence, then the privileged vehicle
    /// finishing, then the step ceiling.
    pub fn check(
        &self,
        done: bool,
        privileged_finished: bool,
        steps: u64,
    ) -> Option<TerminationReason> {
        if done {
            Some(TerminationReason::Done)
        } else if self.stop_on_privileged_finish && privileged_finished {
            Some(TerminationReason::PrivilegedFinished)
        } else if self.ceiling_reached(steps) {
            Some(TerminationReason::StepCeiling)
        } else {
            None
        }
    }

    /// Returns true once `steps` has reached the step ceiling. A ceiling
    /// of 0 is reached before the first step.
    pub fn ceiling_reached(&self, steps: u64) -> bool {
        self.max_steps.is_some_and(|max| steps >= max)
    }
}

/// Runs a policy against an environment and collects episode statistics.
///
/// The driver owns the environment through a [`SimulatorSession`], so the
/// simulator is released when the driver is dropped or when an episode
/// fails partway through.
#[derive(Debug)]
pub struct EpisodeDriver<E: Environment, P: Policy> {
    session: SimulatorSession<E>,
    policy: P,
    privileged_id: VehicleId,
    termination: TerminationPolicy,
    deterministic: bool,
    progress_every: u64,
    reward: Option<RewardShaper>,
    diagnostics: Option<SpawnDiagnostics>,
}

impl<E: Environment, P: Policy> EpisodeDriver<E, P> {
    pub fn new(env: E, policy: P, privileged_id: impl Into<VehicleId>) -> Self {
        Self {
            session: SimulatorSession::new(env),
            policy,
            privileged_id: privileged_id.into(),
            termination: TerminationPolicy::default(),
            deterministic: true,
            progress_every: 0,
            reward: None,
            diagnostics: None,
        }
    }

    /// Driver set up from a run configuration: privileged ID, termination
    /// policy, progress cadence, reward shaping and spawn diagnostics.
    pub fn from_config(env: E, policy: P, config: &RunConfig) -> Self {
        Self::new(env, policy, &config.priority.privileged_id)
            .with_termination(config.termination.clone())
            .with_progress_every(config.progress_every)
            .with_reward_shaper(RewardShaper::new(config.reward.clone()))
            .with_diagnostics(SpawnDiagnostics::from_config(&config.priority))
    }

    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Log progress every `steps` steps. 0 disables progress logging.
    pub fn with_progress_every(mut self, steps: u64) -> Self {
        self.progress_every = steps;
        self
    }

    /// Accumulate the shaped reward of every step on the outcome.
    pub fn with_reward_shaper(mut self, shaper: RewardShaper) -> Self {
        self.reward = Some(shaper);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: SpawnDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn session(&self) -> &SimulatorSession<E> {
        &self.session
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn termination(&self) -> &TerminationPolicy {
        &self.termination
    }

    /// Releases the simulator. Further episodes fail.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Runs one episode from reset to termination.
    ///
    /// # Errors
    ///
    /// Fails if the simulator cannot be reset or stepped. The session is
    /// closed before the error is returned. Telemetry failures do not fail
    /// the episode; they are counted in [`EpisodeOutcome::telemetry_gaps`].
    pub fn run_episode(&mut self) -> Result<EpisodeOutcome, EpisodeError> {
        let result = self.drive();
        if let Err(err) = &result {
            warn!(error = %err, "episode aborted; closing simulator");
            self.session.close();
        }
        result
    }

    /// Runs `n` episodes back to back on the same session.
    pub fn run_episodes(&mut self, n: usize) -> Result<Vec<EpisodeOutcome>, EpisodeError> {
        let mut outcomes = Vec::with_capacity(n);
        for episode in 0..n {
            debug!(episode, "starting episode");
            outcomes.push(self.run_episode()?);
        }
        Ok(outcomes)
    }

    fn drive(&mut self) -> Result<EpisodeOutcome, EpisodeError> {
        let mut observation = self.session.reset().map_err(EpisodeError::Reset)?;
        let mut tracker = LifecycleTracker::new(self.privileged_id.clone());
        let mut ledger = WaitingTimeLedger::new(self.privileged_id.clone());
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.reset();
        }

        let mut steps = 0u64;
        let mut telemetry_gaps = 0u64;
        let mut final_sim_time = 0.0;
        let mut shaped_return = 0.0;
        let mut spawn_reports: Vec<SpawnReport> = Vec::new();

        let termination = loop {
            if self.termination.ceiling_reached(steps) {
                break TerminationReason::StepCeiling;
            }
            let action = self.policy.predict(&observation, self.deterministic);
            let transition = self
                .session
                .step(action)
                .map_err(|source| EpisodeError::Step {
                    step: steps + 1,
                    source,
                })?;
            steps += 1;

            let telemetry = self.session.telemetry();
            let snapshot = telemetry.snapshot();
            match &snapshot {
                Ok(snapshot) => {
                    match tracker.observe(snapshot) {
                        Some(LifecycleEvent::Entered { time }) => {
                            info!(
                                vehicle = %self.privileged_id,
                                sim_time = time,
                                "privileged vehicle entered"
                            );
                        }
                        Some(LifecycleEvent::Exited { time, transit }) => {
                            info!(
                                vehicle = %self.privileged_id,
                                sim_time = time,
                                transit,
                                "privileged vehicle finished"
                            );
                        }
                        None => {}
                    }
                    ledger.observe(snapshot);
                    final_sim_time = snapshot.sim_time;

                    if let Some(diagnostics) = self.diagnostics.as_mut() {
                        spawn_reports.extend(diagnostics.inspect(steps, snapshot, &telemetry));
                    }
                    if self.progress_every > 0 && steps % self.progress_every == 0 {
                        debug!(
                            step = steps,
                            sim_time = snapshot.sim_time,
                            vehicles = snapshot.vehicle_count(),
                            "episode progress"
                        );
                    }
                }
                Err(err) => {
                    telemetry_gaps += 1;
                    warn!(step = steps, error = %err, "telemetry unavailable; step not recorded");
                }
            }

            if let Some(shaper) = &self.reward {
                shaped_return +=
                    shaper.reward_or_default(snapshot.as_ref(), || telemetry.lane_waits());
            }
            observation = transition.observation;

            let finished = tracker.is_finished();
            if let Some(reason) = self.termination.check(transition.done, finished, steps) {
                break reason;
            }
        };

        let outcome = EpisodeOutcome {
            run_id: crate::generate_id(),
            privileged_entry: tracker.entry_time(),
            privileged_transit: tracker.transit_duration(),
            civilian_mean_wait: ledger.summary(),
            civilians_observed: ledger.len(),
            steps,
            telemetry_gaps,
            final_sim_time,
            termination,
            shaped_return: self.reward.as_ref().map(|_| shaped_return),
            spawn_reports,
        };
        info!(
            run_id = %outcome.run_id,
            steps,
            termination = ?termination,
            transit = ?outcome.privileged_transit,
            civilian_mean_wait = outcome.civilian_mean_wait,
            policy = self.policy.name(),
            "episode finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardConfig;
    use crate::control::{FixedTimePolicy, RandomPolicy};
    use crate::simulator::{PhaseAction, ReplayFrame, ReplaySimulator, SimulatorError};
    use crate::telemetry::VehicleTelemetry;

    const HERO: &str = "hero_ambulance";

    fn hero(speed: f64) -> VehicleTelemetry {
        VehicleTelemetry::new(HERO, "ambulance_type", speed, 0.0)
    }

    fn car(id: &str, wait: f64) -> VehicleTelemetry {
        VehicleTelemetry::new(id, "passenger", 3.0, wait)
    }

    /// Hero present from t=2 to t=4, civilians v1 and v2.
    fn frames() -> Vec<ReplayFrame> {
        vec![
            ReplayFrame::new(0.0),
            ReplayFrame::new(1.0).vehicle(car("v1", 1.0)).lanes(vec![1.0]),
            ReplayFrame::new(2.0)
                .vehicle(car("v1", 4.0))
                .vehicle(hero(0.5))
                .lanes(vec![2.0]),
            ReplayFrame::new(3.0).vehicle(car("v2", 2.0)).vehicle(hero(8.0)),
            ReplayFrame::new(4.0).vehicle(car("v2", 1.0)),
            ReplayFrame::new(5.0),
        ]
    }

    #[test]
    fn runs_until_done() {
        let mut driver = EpisodeDriver::new(ReplaySimulator::new(frames()), FixedTimePolicy, HERO);
        let outcome = driver.run_episode().unwrap();

        assert_eq!(outcome.steps, 5);
        assert_eq!(outcome.termination, TerminationReason::Done);
        assert_eq!(outcome.privileged_entry, Some(2.0));
        assert_eq!(outcome.privileged_transit, Some(2.0));
        assert_eq!(outcome.civilians_observed, 2);
        assert!((outcome.civilian_mean_wait - 3.0).abs() < 1e-10);
        assert_eq!(outcome.final_sim_time, 5.0);
        assert_eq!(outcome.telemetry_gaps, 0);
        assert_eq!(outcome.shaped_return, None);
    }

    #[test]
    fn early_stop_is_opt_in() {
        let mut driver = EpisodeDriver::new(ReplaySimulator::new(frames()), FixedTimePolicy, HERO)
            .with_termination(TerminationPolicy {
                max_steps: None,
                stop_on_privileged_finish: true,
            });
        let outcome = driver.run_episode().unwrap();
        assert_eq!(outcome.termination, TerminationReason::PrivilegedFinished);
        assert_eq!(outcome.steps, 4);
        assert_eq!(outcome.privileged_transit, Some(2.0));
    }

    #[test]
    fn step_ceiling_stops_episode() {
        let mut driver = EpisodeDriver::new(ReplaySimulator::new(frames()), FixedTimePolicy, HERO)
            .with_termination(TerminationPolicy {
                max_steps: Some(2),
                stop_on_privileged_finish: false,
            });
        let outcome = driver.run_episode().unwrap();
        assert_eq!(outcome.termination, TerminationReason::StepCeiling);
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.privileged_transit, None);
    }

    #[test]
    fn zero_step_ceiling_never_steps() {
        let mut driver = EpisodeDriver::new(ReplaySimulator::new(frames()), FixedTimePolicy, HERO)
            .with_termination(TerminationPolicy {
                max_steps: Some(0),
                stop_on_privileged_finish: false,
            });
        let outcome = driver.run_episode().unwrap();
        assert_eq!(outcome.termination, TerminationReason::StepCeiling);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.civilians_observed, 0);
        assert!(driver.session().environment().actions().is_empty());
    }

    #[test]
    fn done_outranks_ceiling_on_same_step() {
        let policy = TerminationPolicy {
            max_steps: Some(5),
            stop_on_privileged_finish: true,
        };
        assert_eq!(policy.check(true, true, 5), Some(TerminationReason::Done));
        assert_eq!(
            policy.check(false, true, 5),
            Some(TerminationReason::PrivilegedFinished)
        );
        assert_eq!(policy.check(false, false, 5), Some(TerminationReason::StepCeiling));
        assert_eq!(policy.check(false, false, 4), None);
        assert!(policy.ceiling_reached(5));
        assert!(!TerminationPolicy::default().ceiling_reached(u64::MAX));
    }

    #[test]
    fn telemetry_gap_is_counted_not_fatal() {
        let sim = ReplaySimulator::new(frames()).fail_telemetry_at(3);
        let mut driver = EpisodeDriver::new(sim, FixedTimePolicy, HERO)
            .with_reward_shaper(RewardShaper::default());
        let outcome = driver.run_episode().unwrap();

        assert_eq!(outcome.steps, 5);
        assert_eq!(outcome.telemetry_gaps, 1);
        // Step 3 (t=3) was skipped; v2 is only seen at t=4 with wait 1.
        assert_eq!(outcome.civilians_observed, 2);
        assert!((outcome.civilian_mean_wait - 2.5).abs() < 1e-10);
        assert_eq!(outcome.privileged_transit, Some(2.0));
        assert!(outcome.shaped_return.is_some());
    }

    #[test]
    fn shaped_return_sums_step_rewards() {
        let config = RewardConfig {
            stall_penalty: 100.0,
            ..RewardConfig::default()
        };
        let mut driver = EpisodeDriver::new(ReplaySimulator::new(frames()), FixedTimePolicy, HERO)
            .with_reward_shaper(RewardShaper::new(config));
        let outcome = driver.run_episode().unwrap();
        // Lanes: 1 + 2; one stalled ambulance at t=2.
        let expected = -(1.0 + 2.0 + 100.0);
        assert!((outcome.shaped_return.unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn step_failure_closes_session() {
        let sim = ReplaySimulator::new(frames()).fail_step_at(2);
        let closes = sim.close_counter();
        let mut driver = EpisodeDriver::new(sim, FixedTimePolicy, HERO);

        let err = driver.run_episode().unwrap_err();
        assert!(matches!(
            err,
            EpisodeError::Step {
                step: 2,
                source: SimulatorError::Backend(_)
            }
        ));
        assert!(driver.session().is_closed());
        assert_eq!(closes.count(), 1);
        assert!(matches!(driver.run_episode(), Err(EpisodeError::Reset(_))));
    }

    #[test]
    fn policy_actions_reach_environment() {
        let sim = ReplaySimulator::new(frames());
        let mut driver = EpisodeDriver::new(sim, RandomPolicy::seeded(3, 7), HERO);
        driver.run_episode().unwrap();
        let actions = driver.session().environment().actions();
        assert_eq!(actions.len(), 5);
        assert!(actions
            .iter()
            .all(|a| matches!(a, PhaseAction::Select(i) if *i < 3)));
    }

    #[test]
    fn episodes_are_independent() {
        let mut driver = EpisodeDriver::new(ReplaySimulator::new(frames()), FixedTimePolicy, HERO);
        let outcomes = driver.run_episodes(2).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].privileged_transit, outcomes[1].privileged_transit);
        assert_eq!(outcomes[0].civilian_mean_wait, outcomes[1].civilian_mean_wait);
        assert_ne!(outcomes[0].run_id, outcomes[1].run_id);
    }

    #[test]
    fn termination_precedence() {
        let policy = TerminationPolicy {
            max_steps: Some(3),
            stop_on_privileged_finish: true,
        };
        assert_eq!(policy.check(true, true, 3), Some(TerminationReason::Done));
        assert_eq!(
            policy.check(false, true, 3),
            Some(TerminationReason::PrivilegedFinished)
        );
        assert_eq!(policy.check(false, false, 3), Some(TerminationReason::StepCeiling));
        assert_eq!(policy.check(false, false, 2), None);
        assert_eq!(TerminationPolicy::run_to_completion().check(false, true, 1_000_000), None);
    }
}
