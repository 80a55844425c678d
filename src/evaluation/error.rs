//! Errors raised while driving episodes and persisting their results.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::simulator::SimulatorError;

/// Errors that abort an episode.
///
/// Telemetry failures never appear here: they are counted as gaps on the
/// outcome and the episode continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EpisodeError {
    #[error("Simulator reset failed: {0}")]
    Reset(#[source] SimulatorError),

    #[error("Simulator step {step} failed: {source}")]
    Step {
        step: u64,
        #[source]
        source: SimulatorError,
    },
}

/// Errors reading or writing the two-line result file.
#[derive(Debug, Error)]
pub enum ResultFileError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Line {line} is not a number: {content:?}")]
    Malformed { line: usize, content: String },

    #[error("Result file has no line {line}")]
    Missing { line: usize },
}
