//! Client side of the job protocol: check the connection, create a job,
//! then poll its status until it finishes.

use crate::api::error::{Field, JobError, TransportError};
use crate::api::job_id::JobIdGenerator;
use crate::api::models::{
    ConnectionCheckRequest, HealthReport, JobStatus, JobStatusSnapshot, ProcessTextRequest,
    ProcessTextResponse, Progress,
};
use crate::api::transport::{HttpTransport, Transport};
use crate::config::settings::{clamp_worker_limit, Settings};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Gap between status polls unless the caller picks another
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

const TEST_CONNECTION_PATH: &str = "/api/test-connection";
const PROCESS_TEXT_PATH: &str = "/api/process-text";
const STATUS_PATH: &str = "/api/processing-status";
const HEALTH_PATH: &str = "/api/health";

#[derive(Clone)]
pub struct JobClient {
    transport: Arc<dyn Transport>,
    ids: Arc<JobIdGenerator>,
}

impl JobClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            ids: Arc::new(JobIdGenerator::new()),
        }
    }

    /// Client for a server reachable over HTTP at `server_url`
    pub fn http(server_url: &str) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(server_url)?;
        debug!(target: "job", "Using processing server {}", transport.base_url());
        Ok(Self::new(Arc::new(transport)))
    }

    /// Reject empty input locally, before anything touches the network
    pub fn validate_inputs(text: &str, prompt: &str, settings: &Settings) -> Result<(), JobError> {
        if text.trim().is_empty() {
            return Err(JobError::Validation(Field::Text));
        }
        if prompt.trim().is_empty() {
            return Err(JobError::Validation(Field::Prompt));
        }
        if !settings.has_api_key() {
            return Err(JobError::Validation(Field::ApiKey));
        }
        Ok(())
    }

    pub async fn verify_connectivity(&self, settings: &Settings) -> Result<(), JobError> {
        let body = to_body(&ConnectionCheckRequest {
            api_key: &settings.api_key,
            base_url: &settings.base_url,
        })
        .map_err(JobError::Connectivity)?;

        let reply = self
            .transport
            .post_json(TEST_CONNECTION_PATH, &body)
            .await
            .map_err(|e| JobError::Connectivity(e.0))?;

        if !reply.is_success() {
            let message = reply
                .detail()
                .unwrap_or_else(|| "Connection failed".to_string());
            return Err(JobError::Connectivity(message));
        }

        debug!(target: "job", "Connection check passed for {}", settings.base_url);
        Ok(())
    }

    /// Create a job and return its id without waiting for it to run
    pub async fn submit(
        &self,
        text: &str,
        prompt: &str,
        settings: &Settings,
    ) -> Result<String, JobError> {
        Self::validate_inputs(text, prompt, settings)?;

        let job_id = self.ids.next_id();
        let body = to_body(&ProcessTextRequest {
            text,
            prompt,
            api_key: &settings.api_key,
            base_url: &settings.base_url,
            model: &settings.model,
            max_workers: clamp_worker_limit(settings.max_workers as i64),
            session_id: &job_id,
        })
        .map_err(JobError::Submission)?;

        let reply = self
            .transport
            .post_json(PROCESS_TEXT_PATH, &body)
            .await
            .map_err(|e| JobError::Submission(e.0))?;

        if !reply.is_success() {
            let message = reply
                .detail()
                .unwrap_or_else(|| "Processing failed to start".to_string());
            return Err(JobError::Submission(message));
        }

        if let Ok(response) = serde_json::from_str::<ProcessTextResponse>(&reply.body) {
            match response.session_id {
                Some(echoed) if echoed != job_id => {
                    warn!(target: "job", "Server echoed job id {} for submitted {}", echoed, job_id);
                }
                _ => {}
            }
            if let Some(message) = response.message {
                debug!(target: "job", "Server: {}", message);
            }
        }

        info!(
            target: "job",
            "Submitted job {} ({} chars, model {}, {} workers)",
            job_id,
            text.chars().count(),
            settings.model,
            settings.max_workers
        );
        Ok(job_id)
    }

    /// Fetch the current status of a job once
    pub async fn poll_status(&self, job_id: &str) -> Result<JobStatusSnapshot, JobError> {
        let reply = self
            .transport
            .get(&format!("{}/{}", STATUS_PATH, job_id))
            .await
            .map_err(|e| JobError::Status(e.0))?;

        if !reply.is_success() {
            let message = reply
                .detail()
                .unwrap_or_else(|| "Failed to get status".to_string());
            return Err(JobError::Status(message));
        }

        serde_json::from_str(&reply.body)
            .map_err(|e| JobError::Status(format!("Invalid status response: {}", e)))
    }

    /// Poll every `poll_interval` until the job reaches a terminal state.
    ///
    /// `on_progress` runs after each successful poll. Cancelling the token
    /// stops the loop before the next poll is issued and abandons one that is
    /// in flight; the job itself keeps running on the server.
    pub async fn run_to_completion<F>(
        &self,
        job_id: &str,
        mut on_progress: F,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, JobError>
    where
        F: FnMut(Progress),
    {
        let mut reported = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                _ = tokio::time::sleep(poll_interval) => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                polled = self.poll_status(job_id) => polled,
            };
            let snapshot = polled.map_err(|e| JobError::Processing(e.to_string()))?;

            let progress = snapshot.progress();
            reported = reported.max(progress.completed);
            debug!(
                target: "job",
                "Job {} {:?}: {}/{}",
                job_id, snapshot.status, reported, progress.total
            );
            on_progress(Progress {
                completed: reported,
                ..progress
            });

            match snapshot.status {
                JobStatus::Completed => {
                    info!(target: "job", "Job {} completed", job_id);
                    return Ok(snapshot.result.unwrap_or_default());
                }
                JobStatus::Failed => {
                    let message = snapshot
                        .error
                        .unwrap_or_else(|| "Processing failed".to_string());
                    warn!(target: "job", "Job {} failed: {}", job_id, message);
                    return Err(JobError::Processing(message));
                }
                JobStatus::Pending | JobStatus::Running => {}
            }
        }
    }

    /// Run the polling loop as a background task with its own cancel handle
    pub fn spawn_run<F>(&self, job_id: String, on_progress: F, poll_interval: Duration) -> RunningJob
    where
        F: FnMut(Progress) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let client = self.clone();

        let handle = tokio::spawn(async move {
            client
                .run_to_completion(&job_id, on_progress, poll_interval, &token)
                .await
        });

        RunningJob { cancel, handle }
    }

    pub async fn health(&self) -> Result<HealthReport, JobError> {
        let reply = self
            .transport
            .get(HEALTH_PATH)
            .await
            .map_err(|e| JobError::Status(e.0))?;

        if !reply.is_success() {
            let message = reply
                .detail()
                .unwrap_or_else(|| "Health check failed".to_string());
            return Err(JobError::Status(message));
        }

        serde_json::from_str(&reply.body)
            .map_err(|e| JobError::Status(format!("Invalid health response: {}", e)))
    }
}

/// A polling loop running on the tokio runtime
pub struct RunningJob {
    cancel: CancellationToken,
    handle: JoinHandle<Result<String, JobError>>,
}

impl RunningJob {
    /// Stop observing the job. The server-side job is left alone.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Result<String, JobError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(JobError::Cancelled),
            Err(e) => Err(JobError::Processing(format!("Polling task failed: {}", e))),
        }
    }
}

fn to_body<T: Serialize>(request: &T) -> Result<Value, String> {
    serde_json::to_value(request).map_err(|e| e.to_string())
}
