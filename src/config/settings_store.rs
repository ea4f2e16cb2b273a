use crate::config::settings::{Settings, STORAGE_KEY};
use crate::utils::app_paths::AppPaths;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed home for the settings record
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(AppPaths::data_dir()?))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", STORAGE_KEY))
    }

    /// Load the saved record merged over defaults. A missing file is not an
    /// error.
    pub fn load(&self) -> Result<Settings> {
        let path = self.path();
        if !path.exists() {
            debug!(target: "settings", "No saved settings at {}", path.display());
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str::<Value>(&contents)
            .map_err(anyhow::Error::from)
            .and_then(|stored| Settings::merged_over_defaults(&stored))
            .with_context(|| {
                format!(
                    "Settings file {} is unreadable; delete it or run `textproc settings set`",
                    path.display()
                )
            })
    }

    /// Validate and persist. Returns the record as written.
    pub fn save(&self, settings: &Settings) -> Result<Settings> {
        let validated = settings.clone().validated();
        Self::write(&self.path(), &validated)?;
        info!(target: "settings", "Settings saved to {}", self.path().display());
        Ok(validated)
    }

    fn write(path: &Path, settings: &Settings) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(settings)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
