use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes finished results out as downloadable text files
pub struct DataExporter;

impl DataExporter {
    /// `processed_text_2024-05-01T09-30-00.txt`; colons are swapped for
    /// dashes so the name is valid on every filesystem.
    pub fn file_name_for(timestamp: DateTime<Utc>) -> String {
        let stamp = timestamp
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
            .replace(':', "-");
        format!("processed_text_{}.txt", stamp)
    }

    /// Save `content` as UTF-8 text in `dir` and return the file path
    pub fn export_text(content: &str, dir: &Path) -> Result<PathBuf> {
        Self::export_text_at(content, dir, Utc::now())
    }

    pub fn export_text_at(content: &str, dir: &Path, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        if content.is_empty() {
            return Err(anyhow!("No content to download"));
        }

        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name_for(timestamp));
        fs::write(&path, content.as_bytes())?;

        Ok(path)
    }
}
