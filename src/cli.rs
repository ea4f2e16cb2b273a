//! Command-line arguments for `textproc`
//!
//! ```bash
//! textproc settings set --api-key sk-... --max-workers 8
//! textproc process --input transcript.txt --save-to ./out --copy
//! TEXTPROC_SERVER=http://10.0.0.5:5000 textproc health
//! ```

use crate::api::{JobError, DEFAULT_POLL_INTERVAL_MS};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";

#[derive(Debug, Parser)]
#[command(name = "textproc")]
#[command(about = "Submit text to a processing server and collect the result")]
#[command(version)]
pub struct Cli {
    /// Processing server root URL
    #[arg(long, global = true, default_value = DEFAULT_SERVER, env = "TEXTPROC_SERVER")]
    pub server: String,

    /// Directory holding the saved settings (defaults to the platform data dir)
    #[arg(long, global = true, env = "TEXTPROC_SETTINGS_DIR")]
    pub settings_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process text and wait for the result
    Process(ProcessArgs),

    /// Check that the server can reach the model provider with the saved settings
    Check,

    /// Ask the server whether it is up
    Health,

    /// Show or change saved settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// File to read text from; `-` or nothing reads stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Processing prompt
    #[arg(short, long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Also save the result as a timestamped .txt file in the downloads directory
    #[arg(long)]
    pub save: bool,

    /// Save the result in this directory instead of the downloads directory
    #[arg(long)]
    pub save_to: Option<PathBuf>,

    /// Copy the result to the clipboard
    #[arg(long)]
    pub copy: bool,

    /// Milliseconds between status polls
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_ms: u64,

    /// Stop waiting after this many seconds (the job keeps running server-side)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set(SettingsUpdate),
}

#[derive(Debug, Args)]
pub struct SettingsUpdate {
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// 1-10; anything non-numeric resets to 5
    #[arg(long)]
    pub max_workers: Option<String>,

    #[arg(long, action = ArgAction::Set)]
    pub dark_mode: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.base_url.is_none()
            && self.model.is_none()
            && self.max_workers.is_none()
            && self.dark_mode.is_none()
    }
}

impl Command {
    /// `settings set` overwrites the whole record, so an unreadable file
    /// shouldn't stop it
    pub fn can_replace_settings(&self) -> bool {
        matches!(self, Command::Settings(SettingsCommand::Set(_)))
    }
}

/// Whether a failed command still needs an "Error:" line. Cancellation has
/// already been reported by the time it surfaces here.
pub fn should_report(err: &anyhow::Error) -> bool {
    !err.downcast_ref::<JobError>().map_or(false, JobError::is_cancelled)
}
