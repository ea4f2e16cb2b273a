use crate::api::error::JobError;
use crate::api::job_client::JobClient;
use crate::api::models::Progress;
use crate::config::settings::Settings;
use crate::config::settings_store::SettingsStore;
use crate::data_exporter::DataExporter;
use crate::yank_manager::{YankManager, YankOutcome};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Prompt used when the caller doesn't supply one: turn a meeting
/// transcript into clean first-person prose.
pub const DEFAULT_PROMPT: &str = "你是会议记录整理人员，以下是一段录音的逐字稿，请逐字将其整理成前后连贯的文字，需要注意：
1.保留完整保留原始录音的所有细节。
2.尽量保留原文语义、语感
3.请修改错别字，符合中文语法规范。
4.去掉说话人和时间戳。
5.采用第一人称：我。
6.请足够详细，字数越多越好。
7.保持原始录音逐字稿的语言风格。
8.直接输出结果，不要添加其他提示。";

/// Milestones of a processing run, in the order they happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Connected,
    Submitted { job_id: String },
    Progress(Progress),
}

/// Everything one user works with: their settings, the client, and the
/// last finished result. Owned by the caller; nothing here is global.
pub struct Session {
    client: JobClient,
    store: SettingsStore,
    settings: Settings,
    last_result: Option<String>,
}

impl Session {
    /// Start a session with the settings saved in `store`
    pub fn open(client: JobClient, store: SettingsStore) -> Result<Self> {
        let settings = store.load()?;
        Ok(Self::with_settings(client, store, settings))
    }

    /// Like `open`, but an unreadable settings file yields defaults so the
    /// next save can replace it
    pub fn open_or_default(client: JobClient, store: SettingsStore) -> Self {
        let settings = store.load().unwrap_or_else(|e| {
            warn!(target: "session", "Ignoring saved settings: {:#}", e);
            Settings::default()
        });
        Self::with_settings(client, store, settings)
    }

    pub fn with_settings(client: JobClient, store: SettingsStore, settings: Settings) -> Self {
        Self {
            client,
            store,
            settings,
            last_result: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &JobClient {
        &self.client
    }

    /// Edit, validate and persist the settings in one step
    pub fn update_settings<F>(&mut self, edit: F) -> Result<&Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut edited = self.settings.clone();
        edit(&mut edited);
        self.settings = self.store.save(&edited)?;
        Ok(&self.settings)
    }

    pub async fn check_connection(&self) -> Result<(), JobError> {
        self.client.verify_connectivity(&self.settings).await
    }

    /// Validate, check the connection, submit, and wait for the result.
    /// Any previous result is dropped first so a failed run never leaves a
    /// stale one behind.
    pub async fn process_text<F>(
        &mut self,
        text: &str,
        prompt: &str,
        mut on_event: F,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, JobError>
    where
        F: FnMut(ProcessEvent),
    {
        self.last_result = None;
        let text = text.trim();
        let prompt = prompt.trim();

        JobClient::validate_inputs(text, prompt, &self.settings)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            checked = self.client.verify_connectivity(&self.settings) => checked?,
        }
        on_event(ProcessEvent::Connected);

        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            submitted = self.client.submit(text, prompt, &self.settings) => submitted?,
        };
        on_event(ProcessEvent::Submitted {
            job_id: job_id.clone(),
        });

        let result = self
            .client
            .run_to_completion(
                &job_id,
                |p| on_event(ProcessEvent::Progress(p)),
                poll_interval,
                cancel,
            )
            .await?;

        info!(target: "session", "Job {} returned {} chars", job_id, result.chars().count());
        self.last_result = Some(result.clone());
        Ok(result)
    }

    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn export_result(&self, dir: &Path) -> Result<PathBuf> {
        DataExporter::export_text(self.last_result().unwrap_or_default(), dir)
    }

    pub fn copy_result(&self) -> Result<YankOutcome> {
        YankManager::yank_text(self.last_result().unwrap_or_default())
    }
}
