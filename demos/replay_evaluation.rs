//! Evaluates a fixed-time baseline and a random controller on a scripted
//! replay, writes both result files, and compares them.
//!
//! Run with `RUST_LOG=corridor=debug` to see per-step progress.

use anyhow::Context;
use corridor::control::{FixedTimePolicy, RandomPolicy};
use corridor::evaluation::{Comparison, EvaluationSummary};
use corridor::simulator::{ReplayFrame, ReplaySimulator, StepShape};
use corridor::telemetry::VehicleTelemetry;
use corridor::{EpisodeDriver, RunConfig};
use tracing_subscriber::EnvFilter;

const HERO: &str = "hero_ambulance";

/// One frame every 5 s. The ambulance is on the network from 30 s to 75 s
/// and stalls behind the queue at 40 s and 45 s.
fn scenario(stall_factor: f64) -> Vec<ReplayFrame> {
    (0..=24)
        .map(|i| {
            let t = i as f64 * 5.0;
            let queue = (i % 6) as f64 * stall_factor;
            let mut frame = ReplayFrame::new(t)
                .lanes(vec![queue * 2.0, queue])
                .halting("-E2", (i % 4) as u32);
            for v in 0..3 {
                let id = format!("flow_{}.{}", v, i / 4);
                let wait = queue + v as f64;
                frame = frame.vehicle(VehicleTelemetry::new(id, "passenger", 6.0, wait));
            }
            if (30.0..75.0).contains(&t) {
                let speed = if t == 40.0 || t == 45.0 { 0.2 } else { 9.0 };
                frame = frame.vehicle(VehicleTelemetry::new(HERO, "ambulance_type", speed, 0.0));
            }
            frame
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let out_dir = std::env::temp_dir();

    let baseline_config = RunConfig::baseline();
    baseline_config.validate()?;
    let mut baseline = EpisodeDriver::from_config(
        ReplaySimulator::new(scenario(1.5)),
        FixedTimePolicy,
        &baseline_config,
    );
    let baseline_outcome = baseline.run_episode()?;
    baseline.close();
    let baseline_path = out_dir.join(&baseline_config.result_path);
    baseline_outcome
        .record()
        .write(&baseline_path)
        .context("writing baseline result")?;

    let agent_config = RunConfig::standard();
    agent_config.validate()?;
    let sim = ReplaySimulator::new(scenario(1.0))
        .with_shape(StepShape::Split)
        .with_reset_info();
    let mut agent = EpisodeDriver::from_config(sim, RandomPolicy::seeded(4, 42), &agent_config);
    let outcomes = agent.run_episodes(3)?;
    agent.close();

    let summary = EvaluationSummary::from_outcomes(&outcomes);
    println!("{summary}");

    let agent_path = out_dir.join(&agent_config.result_path);
    outcomes
        .last()
        .context("no agent episodes")?
        .record()
        .write(&agent_path)
        .context("writing agent result")?;

    let comparison = Comparison::from_files(&baseline_path, &agent_path)?;
    println!("{comparison}");
    Ok(())
}
