use anyhow::{anyhow, Result};
use arboard::Clipboard;
use tracing::warn;

/// Manages clipboard copies of job results
pub struct YankManager;

/// What happened to a copy request
#[derive(Debug, PartialEq, Eq)]
pub enum YankOutcome {
    Copied { chars: usize },
    /// No usable clipboard. The caller should show the text for manual copy.
    ManualFallback { text: String, reason: String },
}

impl YankManager {
    /// Copy text to the system clipboard
    pub fn yank_text(content: &str) -> Result<YankOutcome> {
        Self::yank_with(content, |text| {
            let mut clipboard = Clipboard::new()?;
            clipboard.set_text(text)?;
            Ok(())
        })
    }

    /// Copy through `copy`, falling back to manual copy if it fails
    pub fn yank_with<F>(content: &str, copy: F) -> Result<YankOutcome>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        if content.is_empty() {
            return Err(anyhow!("No content to copy"));
        }

        match copy(content) {
            Ok(()) => Ok(YankOutcome::Copied {
                chars: content.chars().count(),
            }),
            Err(e) => {
                warn!(target: "clipboard", "Clipboard unavailable, falling back to manual copy: {}", e);
                Ok(YankOutcome::ManualFallback {
                    text: content.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
