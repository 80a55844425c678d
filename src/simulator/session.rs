//! Scoped ownership of a simulator environment.

use tracing::debug;

use super::connection::ConnectionState;
use super::environment::{Environment, PhaseAction, Transition};
use super::error::SimulatorError;
use crate::telemetry::TelemetryAccessor;

/// Owns an [`Environment`] and releases it on every exit path.
///
/// Dropping the session closes the environment if [`SimulatorSession::close`]
/// has not been called, so an early return or panic in the episode loop
/// never leaks the external simulator process.
#[derive(Debug)]
pub struct SimulatorSession<E: Environment> {
    env: E,
    closed: bool,
}

impl<E: Environment> SimulatorSession<E> {
    pub fn new(env: E) -> Self {
        Self { env, closed: false }
    }

    /// Starts a new episode and returns the initial observation.
    pub fn reset(&mut self) -> Result<Vec<f64>, SimulatorError> {
        self.ensure_open()?;
        Ok(self.env.reset()?.into_observation())
    }

    /// Advances the simulator by one step.
    pub fn step(&mut self, action: PhaseAction) -> Result<Transition, SimulatorError> {
        self.ensure_open()?;
        Ok(self.env.step(action)?.normalize())
    }

    /// Telemetry accessor bound to the current simulator state.
    pub fn telemetry(&self) -> TelemetryAccessor<'_, E::Connection> {
        TelemetryAccessor::new(self.env.connection())
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases the simulator. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            debug!("closing simulator session");
            self.env.close();
            self.closed = true;
        }
    }

    fn ensure_open(&self) -> Result<(), SimulatorError> {
        if self.closed {
            Err(SimulatorError::NotRunning(ConnectionState::Closed))
        } else {
            Ok(())
        }
    }
}

impl<E: Environment> Drop for SimulatorSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}
