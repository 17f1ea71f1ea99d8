use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::batch::{DEFAULT_BATCH_SIZE, DEFAULT_SETTLE_DELAY};
use crate::scan::ScanOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Folder to select videos from.
    pub library_path: PathBuf,
    /// How many clips play side by side.
    pub batch_size: usize,
    /// Pause between the whole batch finishing and moving to the next one.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Descend into subfolders when selecting.
    pub recursive: bool,
    /// Explicit extension allow-list (lowercase, no dot). Empty means detect by MIME type.
    pub extensions: Vec<String>,
    /// Drop clips from the queue when their file disappears from disk.
    pub watch_library: bool,
    /// Simulated clip length for the headless surface; `None` waits for `end` commands.
    #[serde(with = "humantime_serde")]
    pub clip_length: Option<Duration>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            !self.library_path.as_os_str().is_empty(),
            "library-path must be set (in the config file or on the command line)"
        );
        ensure!(self.batch_size > 0, "batch-size must be greater than zero");
        if let Some(clip) = self.clip_length {
            ensure!(!clip.is_zero(), "clip-length must be positive");
        }
        for ext in &mut self.extensions {
            let trimmed = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            ensure!(!trimmed.is_empty(), "extensions must not contain empty entries");
            *ext = trimmed;
        }
        Ok(self)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            recursive: self.recursive,
            extensions: (!self.extensions.is_empty()).then(|| self.extensions.clone()),
        }
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            batch_size: self.batch_size,
            settle_delay: self.settle_delay,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            library_path: PathBuf::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            recursive: true,
            extensions: Vec::new(),
            watch_library: false,
            clip_length: None,
        }
    }
}

/// The subset of the configuration the player task needs.
#[derive(Debug, Clone, Copy)]
pub struct PlayerOptions {
    pub batch_size: usize,
    pub settle_delay: Duration,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}
