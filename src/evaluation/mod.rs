//! Episode evaluation: privileged-vehicle lifecycle, civilian waiting
//! times, the episode loop, and result persistence.

pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod outcome;
pub mod summary;
pub mod waiting;

pub use diagnostics::{SpawnDiagnostics, SpawnReport};
pub use driver::{EpisodeDriver, TerminationPolicy, TerminationReason};
pub use error::{EpisodeError, ResultFileError};
pub use lifecycle::{LifecycleEvent, LifecycleState, LifecycleTracker};
pub use outcome::{EpisodeOutcome, ResultRecord};
pub use summary::{Comparison, EvaluationSummary};
pub use waiting::WaitingTimeLedger;
