use thiserror::Error;

use super::connection::ConnectionState;

/// Errors raised by the simulator control loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    #[error("Simulator connection is not running (state: {0})")]
    NotRunning(ConnectionState),

    #[error("Simulator backend failure: {0}")]
    Backend(String),
}
