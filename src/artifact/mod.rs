//! Model artifact discovery.
//!
//! Checkpoints written during training embed their step count in the file
//! name (`rl_model_30000_steps.zip`). [`ArtifactSelector`] picks the most
//! advanced one from a directory; [`ModelResolver`] decides between a named
//! final model and the checkpoint directory before an evaluation run.

pub mod error;
pub mod naming;
pub mod resolver;
pub mod selector;

pub use error::ArtifactError;
pub use naming::{ArtifactPattern, CheckpointNaming, ModelArtifact};
pub use resolver::{ModelResolver, ModelSource, ResolveOrder, ResolvedModel};
pub use selector::{ArtifactSelector, MalformedPolicy, TagRule};
