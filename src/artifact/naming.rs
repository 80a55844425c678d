//! Checkpoint naming convention.
//!
//! Checkpoints are named `<prefix>_<stepCount>_steps.<ext>`, where the
//! prefix may itself contain separators (`rl_model_optimized`). The step
//! count is read from a fixed position counted from the end of the
//! separator-split name: with the default offset of 2, the second-to-last
//! segment, ignoring anything after its first `.`.

use std::path::{Path, PathBuf};

/// Positional step-count convention for checkpoint file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointNaming {
    pub separator: char,
    /// Position of the step-count segment, counted from the end (1 = last).
    pub step_offset_from_end: usize,
    /// Trailing segment written after the step count.
    pub suffix: String,
    pub extension: String,
}

impl CheckpointNaming {
    /// Extracts the embedded step count from a file name.
    ///
    /// # Example
    ///
    /// ```
    /// use corridor::artifact::CheckpointNaming;
    ///
    /// let naming = CheckpointNaming::default();
    /// assert_eq!(naming.step_count("rl_model_30000_steps.zip"), Some(30000));
    /// assert_eq!(naming.step_count("rl_model_final.zip"), None);
    /// ```
    pub fn step_count(&self, file_name: &str) -> Option<u64> {
        if self.step_offset_from_end == 0 {
            return None;
        }
        let segments: Vec<&str> = file_name.split(self.separator).collect();
        let index = segments.len().checked_sub(self.step_offset_from_end)?;
        let raw = segments[index].split('.').next()?;
        raw.parse().ok()
    }

    /// Renders the file name of the checkpoint written after `steps` steps.
    pub fn file_name(&self, prefix: &str, steps: u64) -> String {
        format!(
            "{prefix}{sep}{steps}{sep}{suffix}.{ext}",
            sep = self.separator,
            suffix = self.suffix,
            ext = self.extension
        )
    }

    /// Step count of a companion file saved next to a checkpoint, such as
    /// `rl_model_10000_steps_vecnormalize.pkl` or
    /// `rl_model_optimized_40000_vecnormalize.pkl`.
    ///
    /// `companion_suffix` is stripped and the remaining stem is read with
    /// the checkpoint convention; the trailing `steps` segment is optional.
    ///
    /// ```
    /// use corridor::artifact::CheckpointNaming;
    ///
    /// let naming = CheckpointNaming::default();
    /// let suffix = "_vecnormalize.pkl";
    /// let stats = "rl_model_9000_vecnormalize.pkl";
    /// assert_eq!(naming.companion_step_count(stats, suffix), Some(9000));
    /// assert_eq!(naming.companion_step_count("vec_normalize.pkl", suffix), None);
    /// ```
    pub fn companion_step_count(&self, file_name: &str, companion_suffix: &str) -> Option<u64> {
        let stem = file_name.strip_suffix(companion_suffix)?;
        let trailer = format!("{}{}", self.separator, self.suffix);
        let checkpoint = if stem.ends_with(&trailer) {
            format!("{stem}.{}", self.extension)
        } else {
            format!("{stem}{trailer}.{}", self.extension)
        };
        self.step_count(&checkpoint)
    }

    /// Returns true if `file_name` carries `tag` as a whole segment.
    pub fn has_segment(&self, file_name: &str, tag: &str) -> bool {
        file_name.split(self.separator).any(|segment| segment == tag)
    }
}

impl Default for CheckpointNaming {
    fn default() -> Self {
        Self {
            separator: '_',
            step_offset_from_end: 2,
            suffix: "steps".into(),
            extension: "zip".into(),
        }
    }
}

/// Which directory entries count as candidate model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPattern {
    /// Required file name prefix, if any.
    pub prefix: Option<String>,
    /// Required extension, without the dot.
    pub extension: String,
}

impl ArtifactPattern {
    /// Matches every file with the given extension.
    pub fn extension(extension: impl Into<String>) -> Self {
        Self {
            prefix: None,
            extension: extension.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let has_extension = file_name
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext == self.extension);
        let has_prefix = self
            .prefix
            .as_deref()
            .map_or(true, |prefix| file_name.starts_with(prefix));
        has_extension && has_prefix
    }
}

impl Default for ArtifactPattern {
    fn default() -> Self {
        Self::extension("zip")
    }
}

/// A saved policy checkpoint with its embedded step count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    pub path: PathBuf,
    pub step_count: u64,
}

impl ModelArtifact {
    pub fn new(path: impl Into<PathBuf>, step_count: u64) -> Self {
        Self {
            path: path.into(),
            step_count,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Path with the extension removed, the form policy loaders expect.
    pub fn stem_path(&self) -> PathBuf {
        strip_extension(&self.path)
    }
}

pub(crate) fn strip_extension(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}
