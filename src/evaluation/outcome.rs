//! Episode outcome and the persisted two-line result file.
//!
//! The result file holds exactly two numbers, one per line:
//!
//! ```text
//! <privileged transit duration in seconds, 0 if it never finished>
//! <civilian mean waiting time in seconds>
//! ```

use std::fs;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use super::diagnostics::SpawnReport;
use super::driver::TerminationReason;
use super::error::ResultFileError;
use crate::units::{seconds, Seconds};

/// Everything recorded about one episode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpisodeOutcome {
    pub run_id: String,
    /// Sim time at which the privileged vehicle first appeared.
    pub privileged_entry: Option<f64>,
    /// `None` if the privileged vehicle never spawned or never finished.
    pub privileged_transit: Option<f64>,
    pub civilian_mean_wait: f64,
    pub civilians_observed: usize,
    pub steps: u64,
    /// Steps whose telemetry snapshot could not be read.
    pub telemetry_gaps: u64,
    pub final_sim_time: f64,
    pub termination: TerminationReason,
    /// Sum of shaped rewards, if the driver was given a reward shaper.
    pub shaped_return: Option<f64>,
    pub spawn_reports: Vec<SpawnReport>,
}

impl EpisodeOutcome {
    pub fn completed(&self) -> bool {
        self.privileged_transit.is_some()
    }

    pub fn transit(&self) -> Option<Seconds> {
        self.privileged_transit.map(seconds)
    }

    /// The two values persisted in the result file.
    pub fn record(&self) -> ResultRecord {
        ResultRecord {
            transit_duration: self.privileged_transit.unwrap_or(0.0),
            civilian_mean_wait: self.civilian_mean_wait,
        }
    }
}

/// Contents of a result file.
///
/// A transit duration of 0 means the privileged vehicle did not complete
/// its trip in that run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultRecord {
    pub transit_duration: f64,
    pub civilian_mean_wait: f64,
}

impl ResultRecord {
    pub fn new(transit_duration: f64, civilian_mean_wait: f64) -> Self {
        Self {
            transit_duration,
            civilian_mean_wait,
        }
    }

    pub fn completed(&self) -> bool {
        self.transit_duration > 0.0
    }

    pub fn to_text(&self) -> String {
        format!("{}\n{}\n", self.transit_duration, self.civilian_mean_wait)
    }

    /// Parses the first two lines of `text`; anything after them is ignored.
    pub fn parse(text: &str) -> Result<Self, ResultFileError> {
        let mut lines = text.lines();
        let transit_duration = parse_line(lines.next(), 1)?;
        let civilian_mean_wait = parse_line(lines.next(), 2)?;
        Ok(Self {
            transit_duration,
            civilian_mean_wait,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), ResultFileError> {
        fs::write(path, self.to_text()).map_err(|source| ResultFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            transit = self.transit_duration,
            civilian_mean_wait = self.civilian_mean_wait,
            "result written"
        );
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, ResultFileError> {
        let text = fs::read_to_string(path).map_err(|source| ResultFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

fn parse_line(line: Option<&str>, number: usize) -> Result<f64, ResultFileError> {
    let content = line.ok_or(ResultFileError::Missing { line: number })?;
    content
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ResultFileError::Malformed {
            line: number,
            content: content.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn outcome(transit: Option<f64>) -> EpisodeOutcome {
        EpisodeOutcome {
            run_id: crate::generate_id(),
            privileged_entry: transit.map(|_| 12.0),
            privileged_transit: transit,
            civilian_mean_wait: 7.25,
            civilians_observed: 4,
            steps: 100,
            telemetry_gaps: 0,
            final_sim_time: 600.0,
            termination: TerminationReason::Done,
            shaped_return: None,
            spawn_reports: Vec::new(),
        }
    }

    #[test]
    fn file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent_result.txt");
        let record = ResultRecord::new(42.5, 7.25);
        record.write(&path).unwrap();
        assert_eq!(ResultRecord::read(&path).unwrap(), record);
    }

    #[test]
    fn text_has_two_lines() {
        let text = ResultRecord::new(42.5, 7.25).to_text();
        assert_eq!(text, "42.5\n7.25\n");
    }

    #[test]
    fn unfinished_transit_writes_zero() {
        let record = outcome(None).record();
        assert_eq!(record.transit_duration, 0.0);
        assert!(!record.completed());
        assert!(outcome(Some(35.0)).record().completed());
    }

    #[test]
    fn parse_tolerates_whitespace() {
        let record = ResultRecord::parse(" 35.0 \r\n4\n").unwrap();
        assert_eq!(record, ResultRecord::new(35.0, 4.0));
    }

    #[test]
    fn parse_reports_bad_lines() {
        assert!(matches!(
            ResultRecord::parse("35.0\n"),
            Err(ResultFileError::Missing { line: 2 })
        ));
        assert!(matches!(
            ResultRecord::parse("fast\n1.0\n"),
            Err(ResultFileError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn parse_rejects_non_finite_values() {
        assert!(matches!(
            ResultRecord::parse("NaN\n1.0\n"),
            Err(ResultFileError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            ResultRecord::parse("1.0\ninf\n"),
            Err(ResultFileError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            ResultRecord::parse("-infinity\n1.0\n"),
            Err(ResultFileError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = ResultRecord::read(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ResultFileError::Io { .. }));
    }

    #[test]
    fn transit_in_minutes() {
        let minutes = crate::units::to_minutes(outcome(Some(90.0)).transit().unwrap());
        assert!((minutes.value() - 1.5).abs() < 1e-10);
    }
}
