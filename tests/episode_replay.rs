//! End-to-end episodes against the replay simulator.

use corridor::config::RunConfig;
use corridor::control::{FixedTimePolicy, RandomPolicy, RewardShaper};
use corridor::evaluation::{
    EpisodeDriver, EpisodeError, EvaluationSummary, ResultRecord, TerminationPolicy,
    TerminationReason,
};
use corridor::simulator::{ReplayFrame, ReplaySimulator, StepShape};
use corridor::telemetry::{TelemetryAccessor, TelemetrySource, VehicleTelemetry};
use corridor::Environment;
use tempfile::tempdir;

const HERO: &str = "hero_ambulance";

fn hero(speed: f64) -> VehicleTelemetry {
    VehicleTelemetry::new(HERO, "ambulance_type", speed, 0.0)
}

fn car(id: &str, wait: f64) -> VehicleTelemetry {
    VehicleTelemetry::new(id, "passenger", 2.0, wait)
}

/// Ambulance present from t=12 to t=46, absent at t=47, back at t=90.
fn corridor_frames() -> Vec<ReplayFrame> {
    let mut frames = vec![ReplayFrame::new(0.0).vehicle(car("v1", 0.0))];
    frames.push(
        ReplayFrame::new(5.0)
            .vehicle(car("v1", 2.0))
            .lanes(vec![2.0, 0.0]),
    );
    frames.push(
        ReplayFrame::new(12.0)
            .vehicle(car("v1", 5.0))
            .vehicle(hero(0.0))
            .lanes(vec![5.0]),
    );
    frames.push(
        ReplayFrame::new(30.0)
            .vehicle(car("v1", 1.0))
            .vehicle(car("v2", 3.0))
            .vehicle(hero(12.0)),
    );
    frames.push(
        ReplayFrame::new(46.0)
            .vehicle(car("v2", 3.0))
            .vehicle(hero(12.0)),
    );
    frames.push(ReplayFrame::new(47.0).vehicle(car("v2", 1.0)));
    frames.push(ReplayFrame::new(90.0).vehicle(hero(10.0)));
    frames.push(ReplayFrame::new(100.0));
    frames
}

/// Runs a single episode on a driver built inline.
trait RunOwned {
    fn run_episode_owned(self) -> corridor::EpisodeOutcome;
}

impl<E: Environment, P: corridor::Policy> RunOwned for EpisodeDriver<E, P> {
    fn run_episode_owned(mut self) -> corridor::EpisodeOutcome {
        self.run_episode().unwrap()
    }
}

#[test]
fn legacy_and_split_shapes_agree() {
    let legacy = EpisodeDriver::new(ReplaySimulator::new(corridor_frames()), FixedTimePolicy, HERO)
        .run_episode_owned();
    let split = EpisodeDriver::new(
        ReplaySimulator::new(corridor_frames())
            .with_shape(StepShape::Split)
            .with_reset_info(),
        FixedTimePolicy,
        HERO,
    )
    .run_episode_owned();

    assert_eq!(legacy.record(), split.record());
    assert_eq!(legacy.steps, split.steps);
    assert_eq!(split.termination, TerminationReason::Done);
}

#[test]
fn reappearance_does_not_reopen_transit() {
    let outcome = EpisodeDriver::new(ReplaySimulator::new(corridor_frames()), FixedTimePolicy, HERO)
        .run_episode_owned();
    assert_eq!(outcome.privileged_entry, Some(12.0));
    assert_eq!(outcome.privileged_transit, Some(35.0));
    assert_eq!(outcome.steps, 7);
    // v1 peaks at 5, v2 at 3.
    assert!((outcome.civilian_mean_wait - 4.0).abs() < 1e-10);
}

#[test]
fn baseline_preset_stops_when_privileged_finishes() {
    let config = RunConfig::baseline();
    let outcome = EpisodeDriver::from_config(
        ReplaySimulator::new(corridor_frames()),
        FixedTimePolicy,
        &config,
    )
    .run_episode_owned();
    assert_eq!(outcome.termination, TerminationReason::PrivilegedFinished);
    assert_eq!(outcome.final_sim_time, 47.0);
    assert!(outcome.shaped_return.is_some());
}

#[test]
fn standard_preset_runs_full_episode() {
    let config = RunConfig::standard();
    let outcome = EpisodeDriver::from_config(
        ReplaySimulator::new(corridor_frames()),
        RandomPolicy::seeded(4, 1),
        &config,
    )
    .run_episode_owned();
    assert_eq!(outcome.termination, TerminationReason::Done);
    assert_eq!(outcome.final_sim_time, 100.0);
}

#[test]
fn telemetry_outage_is_survived() {
    let sim = ReplaySimulator::new(corridor_frames())
        .fail_telemetry_at(1)
        .fail_telemetry_at(2);
    let outcome = EpisodeDriver::new(sim, FixedTimePolicy, HERO)
        .with_reward_shaper(RewardShaper::default())
        .run_episode_owned();

    assert_eq!(outcome.telemetry_gaps, 2);
    assert_eq!(outcome.steps, 7);
    // The entry at t=12 was never observed; the first sighting is t=30.
    assert_eq!(outcome.privileged_entry, Some(30.0));
    assert_eq!(outcome.privileged_transit, Some(17.0));
    // Emergency term falls back to 0, lane term still counts: 2 + 5.
    assert!((outcome.shaped_return.unwrap() + 7.0).abs() < 1e-10);
}

#[test]
fn failed_step_releases_simulator() {
    let sim = ReplaySimulator::new(corridor_frames()).fail_step_at(3);
    let closes = sim.close_counter();
    let mut driver = EpisodeDriver::new(sim, FixedTimePolicy, HERO);

    assert!(matches!(
        driver.run_episode(),
        Err(EpisodeError::Step { step: 3, .. })
    ));
    assert_eq!(closes.count(), 1);
    drop(driver);
    assert_eq!(closes.count(), 1);
}

#[test]
fn simulator_released_on_drop() {
    let sim = ReplaySimulator::new(corridor_frames());
    let closes = sim.close_counter();
    {
        let mut driver = EpisodeDriver::new(sim, FixedTimePolicy, HERO)
            .with_termination(TerminationPolicy {
                max_steps: Some(2),
                stop_on_privileged_finish: false,
            });
        driver.run_episode().unwrap();
        assert_eq!(closes.count(), 0);
    }
    assert_eq!(closes.count(), 1);
}

#[test]
fn result_file_round_trip_from_episode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent_result.txt");

    let outcome = EpisodeDriver::new(ReplaySimulator::new(corridor_frames()), FixedTimePolicy, HERO)
        .run_episode_owned();
    outcome.record().write(&path).unwrap();

    let read = ResultRecord::read(&path).unwrap();
    assert_eq!(read.transit_duration, 35.0);
    assert!((read.civilian_mean_wait - 4.0).abs() < 1e-10);
}

#[test]
fn summary_over_repeated_episodes() {
    let sim = ReplaySimulator::new(corridor_frames());
    let mut driver = EpisodeDriver::new(sim, FixedTimePolicy, HERO);
    let outcomes = driver.run_episodes(3).unwrap();
    let summary = EvaluationSummary::from_outcomes(&outcomes);
    assert_eq!(summary.n_episodes, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.mean_transit, Some(35.0));
}

#[test]
fn telemetry_reads_are_idempotent_within_a_step() {
    let mut sim = ReplaySimulator::new(corridor_frames());
    sim.reset().unwrap();
    sim.step(corridor::PhaseAction::FixedTime).unwrap();
    sim.step(corridor::PhaseAction::FixedTime).unwrap();

    let telemetry = TelemetryAccessor::new(sim.connection());
    let first = telemetry.snapshot().unwrap();
    let second = telemetry.snapshot().unwrap();
    assert_eq!(first, second);
    assert!(first.contains(HERO));
}
