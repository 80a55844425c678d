use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or loading model artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// A file matched the checkpoint pattern but carries no step count at
    /// the expected position.
    #[error("Cannot parse step count from checkpoint name '{name}'")]
    Parse { name: String },

    /// Nothing usable was found; evaluation must not proceed.
    #[error("No model artifact found: {0}")]
    NotFound(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The learning collaborator rejected the artifact.
    #[error("Failed to load model from '{}': {reason}", .path.display())]
    Load { path: PathBuf, reason: String },
}
