//! Aggregation over several episodes and comparison of two runs.

use std::fmt;
use std::path::Path;

use super::error::ResultFileError;
use super::outcome::{EpisodeOutcome, ResultRecord};

/// Aggregated statistics over multiple evaluation episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSummary {
    pub n_episodes: usize,
    /// Episodes in which the privileged vehicle finished its trip.
    pub completed: usize,
    /// Mean transit over completed episodes only; `None` if none completed.
    pub mean_transit: Option<f64>,
    pub mean_civilian_wait: f64,
    pub mean_steps: f64,
    pub telemetry_gaps: u64,
}

impl EvaluationSummary {
    pub fn from_outcomes(outcomes: &[EpisodeOutcome]) -> Self {
        let n = outcomes.len();
        let transits: Vec<f64> = outcomes.iter().filter_map(|o| o.privileged_transit).collect();

        Self {
            n_episodes: n,
            completed: transits.len(),
            mean_transit: mean(&transits),
            mean_civilian_wait: mean_of(outcomes, |o| o.civilian_mean_wait),
            mean_steps: mean_of(outcomes, |o| o.steps as f64),
            telemetry_gaps: outcomes.iter().map(|o| o.telemetry_gaps).sum(),
        }
    }

    /// Percentage of episodes in which the privileged vehicle finished.
    pub fn completion_rate(&self) -> f64 {
        if self.n_episodes == 0 {
            0.0
        } else {
            self.completed as f64 / self.n_episodes as f64 * 100.0
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn mean_of(outcomes: &[EpisodeOutcome], f: impl Fn(&EpisodeOutcome) -> f64) -> f64 {
    let values: Vec<f64> = outcomes.iter().map(f).collect();
    mean(&values).unwrap_or(0.0)
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Evaluation Summary ({} episodes) ===", self.n_episodes)?;
        writeln!(
            f,
            "  Privileged completed:    {}/{} ({:.1}%)",
            self.completed,
            self.n_episodes,
            self.completion_rate()
        )?;
        match self.mean_transit {
            Some(t) => writeln!(f, "  Mean transit time:       {:.2} s", t)?,
            None => writeln!(f, "  Mean transit time:       n/a")?,
        }
        writeln!(f, "  Mean civilian wait:      {:.2} s", self.mean_civilian_wait)?;
        writeln!(f, "  Mean steps:              {:.1}", self.mean_steps)?;
        write!(f, "  Telemetry gaps:          {}", self.telemetry_gaps)
    }
}

/// Candidate run measured against a baseline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub baseline: ResultRecord,
    pub candidate: ResultRecord,
}

impl Comparison {
    pub fn from_records(baseline: ResultRecord, candidate: ResultRecord) -> Self {
        Self { baseline, candidate }
    }

    /// Reads both result files.
    pub fn from_files(baseline: &Path, candidate: &Path) -> Result<Self, ResultFileError> {
        Ok(Self::from_records(
            ResultRecord::read(baseline)?,
            ResultRecord::read(candidate)?,
        ))
    }

    /// Candidate minus baseline transit time. Negative is an improvement.
    ///
    /// `None` unless both runs completed the trip.
    pub fn transit_delta(&self) -> Option<f64> {
        (self.baseline.completed() && self.candidate.completed())
            .then(|| self.candidate.transit_duration - self.baseline.transit_duration)
    }

    /// [`Comparison::transit_delta`] relative to the baseline, in percent.
    pub fn transit_change_pct(&self) -> Option<f64> {
        self.transit_delta()
            .map(|d| d / self.baseline.transit_duration * 100.0)
    }

    pub fn wait_delta(&self) -> f64 {
        self.candidate.civilian_mean_wait - self.baseline.civilian_mean_wait
    }

    /// `None` if the baseline wait is 0.
    pub fn wait_change_pct(&self) -> Option<f64> {
        (self.baseline.civilian_mean_wait != 0.0)
            .then(|| self.wait_delta() / self.baseline.civilian_mean_wait * 100.0)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Baseline vs Candidate ===")?;
        writeln!(
            f,
            "  Transit time:   {:>8.2} s -> {:>8.2} s{}",
            self.baseline.transit_duration,
            self.candidate.transit_duration,
            change(self.transit_change_pct())
        )?;
        write!(
            f,
            "  Civilian wait:  {:>8.2} s -> {:>8.2} s{}",
            self.baseline.civilian_mean_wait,
            self.candidate.civilian_mean_wait,
            change(self.wait_change_pct())
        )
    }
}

fn change(pct: Option<f64>) -> String {
    pct.map(|p| format!("  ({:+.1}%)", p)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::TerminationReason;
    use tempfile::tempdir;

    fn outcome(transit: Option<f64>, wait: f64, steps: u64) -> EpisodeOutcome {
        EpisodeOutcome {
            run_id: crate::generate_id(),
            privileged_entry: None,
            privileged_transit: transit,
            civilian_mean_wait: wait,
            civilians_observed: 10,
            steps,
            telemetry_gaps: 1,
            final_sim_time: 600.0,
            termination: TerminationReason::Done,
            shaped_return: None,
            spawn_reports: Vec::new(),
        }
    }

    #[test]
    fn transit_mean_ignores_unfinished_episodes() {
        let s = EvaluationSummary::from_outcomes(&[
            outcome(Some(30.0), 4.0, 100),
            outcome(None, 6.0, 200),
            outcome(Some(50.0), 5.0, 300),
        ]);
        assert_eq!(s.n_episodes, 3);
        assert_eq!(s.completed, 2);
        assert!((s.mean_transit.unwrap() - 40.0).abs() < 1e-10);
        assert!((s.mean_civilian_wait - 5.0).abs() < 1e-10);
        assert!((s.mean_steps - 200.0).abs() < 1e-10);
        assert_eq!(s.telemetry_gaps, 3);
    }

    #[test]
    fn empty_summary() {
        let s = EvaluationSummary::from_outcomes(&[]);
        assert_eq!(s.mean_transit, None);
        assert_eq!(s.mean_civilian_wait, 0.0);
        assert_eq!(s.completion_rate(), 0.0);
        assert!(s.to_string().contains("n/a"));
    }

    #[test]
    fn comparison_deltas() {
        let c = Comparison::from_records(
            ResultRecord::new(80.0, 10.0),
            ResultRecord::new(60.0, 12.0),
        );
        assert!((c.transit_delta().unwrap() + 20.0).abs() < 1e-10);
        assert!((c.transit_change_pct().unwrap() + 25.0).abs() < 1e-10);
        assert!((c.wait_delta() - 2.0).abs() < 1e-10);
        assert!((c.wait_change_pct().unwrap() - 20.0).abs() < 1e-10);
        assert!(c.to_string().contains("-25.0%"));
    }

    #[test]
    fn unfinished_run_has_no_transit_delta() {
        let c = Comparison::from_records(
            ResultRecord::new(0.0, 0.0),
            ResultRecord::new(60.0, 12.0),
        );
        assert_eq!(c.transit_delta(), None);
        assert_eq!(c.wait_change_pct(), None);
    }

    #[test]
    fn comparison_from_files() {
        let dir = tempdir().unwrap();
        let baseline = dir.path().join("baseline_result.txt");
        let agent = dir.path().join("agent_result.txt");
        ResultRecord::new(75.0, 9.0).write(&baseline).unwrap();
        ResultRecord::new(50.0, 9.0).write(&agent).unwrap();

        let c = Comparison::from_files(&baseline, &agent).unwrap();
        assert_eq!(c.baseline.transit_duration, 75.0);
        assert_eq!(c.wait_delta(), 0.0);
    }
}
