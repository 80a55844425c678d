//! Deterministic checkpoint selection.
//!
//! Candidates are ranked by:
//!
//! 1. embedded step count, highest first;
//! 2. the preferred tag, if a [`TagRule`] is set;
//! 3. file path, lexically smallest first.
//!
//! The result never depends on directory listing order.

use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use super::error::ArtifactError;
use super::naming::{ArtifactPattern, CheckpointNaming, ModelArtifact};

/// How a name segment tag (e.g. `optimized`) influences selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRule {
    /// Tagged artifacts win only among equal step counts.
    BreakTies(String),
    /// If any tagged artifact exists, untagged ones are not considered.
    FilterFirst(String),
}

impl TagRule {
    fn tag(&self) -> &str {
        match self {
            TagRule::BreakTies(tag) | TagRule::FilterFirst(tag) => tag,
        }
    }
}

/// What to do with a matching file whose name has no step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Report [`ArtifactError::Parse`]; the naming convention must hold for
    /// every matching file.
    #[default]
    Fail,
    /// Log and ignore the file.
    Skip,
}

/// Picks the most advanced checkpoint in a directory.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSelector {
    naming: CheckpointNaming,
    pattern: ArtifactPattern,
    tag_rule: Option<TagRule>,
    malformed: MalformedPolicy,
}

impl ArtifactSelector {
    pub fn new(pattern: ArtifactPattern) -> Self {
        Self {
            pattern,
            ..Self::default()
        }
    }

    pub fn with_naming(mut self, naming: CheckpointNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_tag_rule(mut self, rule: TagRule) -> Self {
        self.tag_rule = Some(rule);
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed = policy;
        self
    }

    pub fn naming(&self) -> &CheckpointNaming {
        &self.naming
    }

    /// Selects the checkpoint with the highest step count in `directory`.
    ///
    /// Returns `Ok(None)` if the directory does not exist or no file matches
    /// the pattern.
    ///
    /// # Errors
    ///
    /// * [`ArtifactError::Parse`] if a matching file carries no step count
    ///   and the policy is [`MalformedPolicy::Fail`]
    /// * [`ArtifactError::Io`] if the directory cannot be listed
    pub fn select(&self, directory: &Path) -> Result<Option<ModelArtifact>, ArtifactError> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(dir = %directory.display(), "checkpoint directory does not exist");
                return Ok(None);
            }
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: directory.to_path_buf(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ArtifactError::Io {
                path: directory.to_path_buf(),
                source,
            })?;
            if entry.path().is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        self.select_from_names(directory, names.iter().map(String::as_str))
    }

    /// Selection over already-listed file names in `directory`.
    pub fn select_from_names<'a, I>(
        &self,
        directory: &Path,
        names: I,
    ) -> Result<Option<ModelArtifact>, ArtifactError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut candidates = Vec::new();
        for name in names.into_iter().filter(|n| self.pattern.matches(n)) {
            match self.naming.step_count(name) {
                Some(step_count) => {
                    candidates.push(ModelArtifact::new(directory.join(name), step_count))
                }
                None => match self.malformed {
                    MalformedPolicy::Fail => {
                        return Err(ArtifactError::Parse {
                            name: name.to_string(),
                        })
                    }
                    MalformedPolicy::Skip => {
                        warn!(file = name, "skipping checkpoint without step count");
                    }
                },
            }
        }
        Ok(self.rank(candidates))
    }

    fn is_tagged(&self, artifact: &ModelArtifact) -> bool {
        match (&self.tag_rule, artifact.file_name()) {
            (Some(rule), Some(name)) => self.naming.has_segment(name, rule.tag()),
            _ => false,
        }
    }

    fn rank(&self, mut candidates: Vec<ModelArtifact>) -> Option<ModelArtifact> {
        if let Some(TagRule::FilterFirst(_)) = &self.tag_rule {
            if candidates.iter().any(|a| self.is_tagged(a)) {
                candidates.retain(|a| self.is_tagged(a));
            }
        }
        let break_ties = matches!(self.tag_rule, Some(TagRule::BreakTies(_)));

        candidates.into_iter().max_by(|a, b| {
            let by_tag = if break_ties {
                self.is_tagged(a).cmp(&self.is_tagged(b))
            } else {
                Ordering::Equal
            };
            a.step_count
                .cmp(&b.step_count)
                .then(by_tag)
                .then_with(|| b.path.cmp(&a.path))
        })
    }
}
