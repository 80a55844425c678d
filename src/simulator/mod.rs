//! Boundary with the external traffic simulator.
//!
//! The simulator is reached through two traits: [`SimulatorConnection`]
//! for read-only vehicle/lane queries and [`Environment`] for the
//! reset/step control loop. [`RawStep`] and [`ResetOutput`] absorb the
//! differences between legacy 4-tuple and 5-tuple step results so the
//! episode driver only ever sees a normalized [`Transition`].

pub mod connection;
pub mod environment;
pub mod error;
pub mod replay;
pub mod session;

pub use connection::{ConnectionState, SimulatorConnection};
pub use environment::{Environment, PhaseAction, RawStep, ResetOutput, StepInfo, Transition};
pub use error::SimulatorError;
pub use replay::{ReplayFrame, ReplaySimulator, StepShape};
pub use session::SimulatorSession;
