//! Choosing which model to load before an evaluation run.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::error::ArtifactError;
use super::naming::{strip_extension, ArtifactPattern};
use super::selector::{ArtifactSelector, TagRule};
use crate::config::ArtifactConfig;
use crate::control::PolicyLoader;

/// Order in which the named model and the checkpoint directory are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveOrder {
    /// Use the named final model if present, else the best checkpoint.
    /// A malformed checkpoint name is a hard failure.
    #[default]
    DefaultFirst,
    /// Use the best checkpoint if any, else the named model. A malformed
    /// checkpoint name falls back to the named model when it exists.
    CheckpointsFirst,
}

/// Where a resolved model came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Named,
    Checkpoint { step_count: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Model file, including its extension.
    pub path: PathBuf,
    pub source: ModelSource,
}

impl ResolvedModel {
    /// Path with the extension removed, the form policy loaders expect.
    pub fn stem_path(&self) -> PathBuf {
        strip_extension(&self.path)
    }
}

/// Locates the model (and its normalization statistics) for evaluation.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    default_model: PathBuf,
    checkpoint_dir: PathBuf,
    selector: ArtifactSelector,
    order: ResolveOrder,
    normalization_stats: Option<PathBuf>,
    normalization_suffix: String,
}

impl ModelResolver {
    /// # Arguments
    ///
    /// * `default_model` - Named final model, without extension
    /// * `checkpoint_dir` - Directory searched for `<prefix>_<steps>_steps.zip`
    pub fn new(default_model: impl Into<PathBuf>, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_model: default_model.into(),
            checkpoint_dir: checkpoint_dir.into(),
            selector: ArtifactSelector::default(),
            order: ResolveOrder::default(),
            normalization_stats: None,
            normalization_suffix: "_vecnormalize.pkl".into(),
        }
    }

    /// Builds a resolver from run configuration. A preferred tag restricts
    /// selection to tagged checkpoints whenever any exist.
    pub fn from_config(config: &ArtifactConfig) -> Self {
        let mut selector = ArtifactSelector::new(ArtifactPattern::default());
        if let Some(tag) = &config.preferred_tag {
            selector = selector.with_tag_rule(TagRule::FilterFirst(tag.clone()));
        }
        let mut resolver =
            Self::new(&config.default_model, &config.checkpoint_dir).with_selector(selector);
        resolver.normalization_stats = config.normalization_stats.clone();
        resolver
    }

    pub fn with_selector(mut self, selector: ArtifactSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_order(mut self, order: ResolveOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_normalization_stats(mut self, path: impl Into<PathBuf>) -> Self {
        self.normalization_stats = Some(path.into());
        self
    }

    /// The named model file (`<default_model>.zip`).
    pub fn default_model_file(&self) -> PathBuf {
        let mut name = OsString::from(self.default_model.as_os_str());
        name.push(".");
        name.push(&self.selector.naming().extension);
        PathBuf::from(name)
    }

    /// Resolves the model to load.
    ///
    /// # Errors
    ///
    /// * [`ArtifactError::NotFound`] if neither the named model nor any
    ///   checkpoint exists
    /// * [`ArtifactError::Parse`] if a checkpoint name is malformed and no
    ///   fallback applies
    pub fn resolve(&self) -> Result<ResolvedModel, ArtifactError> {
        let named = self.default_model_file();
        let named_exists = named.is_file();

        let resolved = match self.order {
            ResolveOrder::DefaultFirst => {
                if named_exists {
                    Some(Self::named(named))
                } else {
                    warn!(model = %named.display(), "named model not found; searching checkpoints");
                    self.best_checkpoint()?
                }
            }
            ResolveOrder::CheckpointsFirst => match self.best_checkpoint() {
                Ok(Some(found)) => Some(found),
                Ok(None) => named_exists.then(|| Self::named(named)),
                Err(ArtifactError::Parse { name }) if named_exists => {
                    warn!(
                        file = %name,
                        fallback = %named.display(),
                        "malformed checkpoint name; falling back to named model"
                    );
                    Some(Self::named(named))
                }
                Err(err) => return Err(err),
            },
        };

        resolved.ok_or_else(|| {
            ArtifactError::NotFound(format!(
                "neither '{}' nor a checkpoint in '{}'",
                self.default_model_file().display(),
                self.checkpoint_dir.display()
            ))
        })
    }

    /// Resolves the model and hands it to `loader`.
    pub fn load<L: PolicyLoader>(
        &self,
        loader: &L,
    ) -> Result<(ResolvedModel, L::Policy), ArtifactError> {
        let resolved = self.resolve()?;
        let policy = loader.load(&resolved.stem_path())?;
        info!(model = %resolved.path.display(), source = ?resolved.source, "model loaded");
        Ok((resolved, policy))
    }

    /// Locates observation-normalization statistics for `model`.
    ///
    /// Prefers the configured primary file. Otherwise searches the
    /// checkpoint directory for `*_vecnormalize.pkl`: the file saved at the
    /// same step count as a checkpoint `model` wins, then the highest step
    /// count, then the lexically smallest name.
    pub fn normalization_stats(&self, model: &ResolvedModel) -> Result<PathBuf, ArtifactError> {
        if let Some(primary) = self.normalization_stats.as_deref() {
            if primary.is_file() {
                return Ok(primary.to_path_buf());
            }
            warn!(
                file = %primary.display(),
                "normalization stats not found; searching checkpoints"
            );
        }

        let naming = self.selector.naming();
        let candidates: Vec<(Option<u64>, String)> = list_file_names(&self.checkpoint_dir)?
            .into_iter()
            .filter(|n| n.ends_with(&self.normalization_suffix))
            .map(|n| (naming.companion_step_count(&n, &self.normalization_suffix), n))
            .collect();

        let target = match model.source {
            ModelSource::Checkpoint { step_count } => Some(step_count),
            ModelSource::Named => None,
        };
        let matching = target.and_then(|step| {
            candidates
                .iter()
                .filter(|(s, _)| *s == Some(step))
                .min_by(|a, b| a.1.cmp(&b.1))
        });
        if target.is_some() && matching.is_none() && !candidates.is_empty() {
            warn!(
                model = %model.path.display(),
                "no normalization stats saved with this checkpoint; using the most recent"
            );
        }
        let chosen = matching.or_else(|| {
            candidates
                .iter()
                .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        });

        match chosen {
            Some((_, name)) => {
                let path = self.checkpoint_dir.join(name);
                info!(file = %path.display(), "using normalization stats");
                Ok(path)
            }
            None => Err(ArtifactError::NotFound(format!(
                "no normalization statistics in '{}'",
                self.checkpoint_dir.display()
            ))),
        }
    }

    fn best_checkpoint(&self) -> Result<Option<ResolvedModel>, ArtifactError> {
        Ok(self
            .selector
            .select(&self.checkpoint_dir)?
            .map(|artifact| {
                info!(
                    checkpoint = %artifact.path.display(),
                    steps = artifact.step_count,
                    "found checkpoint"
                );
                ResolvedModel {
                    source: ModelSource::Checkpoint {
                        step_count: artifact.step_count,
                    },
                    path: artifact.path,
                }
            }))
    }

    fn named(path: PathBuf) -> ResolvedModel {
        ResolvedModel {
            path,
            source: ModelSource::Named,
        }
    }
}

fn list_file_names(dir: &Path) -> Result<Vec<String>, ArtifactError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ArtifactError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
