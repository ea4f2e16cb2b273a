use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use textproc_client::api::{HttpReply, JobClient, JobError, Transport, TransportError};
use textproc_client::config::settings::Settings;
use textproc_client::config::settings_store::SettingsStore;
use textproc_client::services::{ProcessEvent, Session};
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(1);

/// In-memory stand-in for the processing server. Each job takes three polls
/// to finish and upper-cases its text; text containing "fail" ends in error.
#[derive(Default)]
struct FakeBackend {
    jobs: Mutex<HashMap<String, (String, usize)>>,
    requests: AtomicUsize,
}

impl FakeBackend {
    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn reply(status: u16, body: Value) -> Result<HttpReply, TransportError> {
        Ok(HttpReply::new(status, body.to_string()))
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn post_json(&self, path: &str, body: &Value) -> Result<HttpReply, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match path {
            "/api/test-connection" => {
                if body["api_key"] == "bad-key" {
                    Self::reply(400, json!({ "detail": "Failed to connect to OpenAI API" }))
                } else {
                    Self::reply(200, json!({ "success": true, "message": "Connection successful" }))
                }
            }
            "/api/process-text" => {
                let id = body["session_id"].as_str().unwrap_or_default().to_string();
                let text = body["text"].as_str().unwrap_or_default().to_string();
                self.jobs.lock().unwrap().insert(id.clone(), (text, 0));
                Self::reply(
                    200,
                    json!({ "success": true, "session_id": id, "message": "Processing started" }),
                )
            }
            _ => Self::reply(404, json!({ "detail": "Not Found" })),
        }
    }

    async fn get(&self, path: &str) -> Result<HttpReply, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let Some(id) = path.strip_prefix("/api/processing-status/") else {
            return Self::reply(404, json!({ "detail": "Not Found" }));
        };

        let mut jobs = self.jobs.lock().unwrap();
        let Some((text, polls)) = jobs.get_mut(id) else {
            return Self::reply(404, json!({ "detail": "Session not found" }));
        };
        *polls += 1;

        let body = match (*polls, text.contains("fail")) {
            (n, true) if n >= 2 => json!({
                "status": "error", "total_chunks": 3, "completed_chunks": 1,
                "results": "", "error": "quota exceeded"
            }),
            (n, false) if n >= 3 => json!({
                "status": "completed", "total_chunks": 3, "completed_chunks": 3,
                "results": text.to_uppercase(), "error": null
            }),
            (n, _) => json!({
                "status": "processing", "total_chunks": 3, "completed_chunks": n - 1,
                "results": "", "error": null
            }),
        };
        Self::reply(200, body)
    }
}

fn settings(api_key: &str) -> Settings {
    Settings {
        api_key: api_key.to_string(),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_submitted_job_can_be_polled() {
    let backend = Arc::new(FakeBackend::default());
    let client = JobClient::new(backend.clone());

    let job_id = client.submit("hello", "shout", &settings("sk")).await.unwrap();
    let snapshot = client.poll_status(&job_id).await.unwrap();
    assert_eq!(snapshot.total_units, 3);
    assert!(!snapshot.status.is_terminal());

    let err = client.poll_status("no-such-job").await.unwrap_err();
    assert!(matches!(err, JobError::Status(ref m) if m == "Session not found"));
}

#[tokio::test]
async fn test_session_processes_text_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::with_settings(
        JobClient::new(backend.clone()),
        SettingsStore::new(temp_dir.path()),
        settings("sk"),
    );

    let mut events = Vec::new();
    let result = session
        .process_text(
            "  meeting notes  ",
            "clean up",
            |e| events.push(e),
            TICK,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result, "MEETING NOTES");
    assert_eq!(session.last_result(), Some("MEETING NOTES"));
    assert_eq!(events[0], ProcessEvent::Connected);
    assert!(matches!(events[1], ProcessEvent::Submitted { .. }));
    let completed: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            ProcessEvent::Progress(p) => Some(p.completed),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![0, 1, 3]);

    let path = session.export_result(temp_dir.path()).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "MEETING NOTES");
}

#[tokio::test]
async fn test_session_reports_server_failure() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::with_settings(
        JobClient::new(backend),
        SettingsStore::new(temp_dir.path()),
        settings("sk"),
    );

    let err = session
        .process_text("please fail", "p", |_| {}, TICK, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Processing(_)));
    assert_eq!(err.to_string(), "quota exceeded");
    assert!(session.last_result().is_none());
    assert!(session.export_result(temp_dir.path()).is_err());
}

#[tokio::test]
async fn test_bad_key_stops_before_submission() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::with_settings(
        JobClient::new(backend.clone()),
        SettingsStore::new(temp_dir.path()),
        settings("bad-key"),
    );

    let err = session
        .process_text("text", "p", |_| {}, TICK, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Connectivity(ref m) if m == "Failed to connect to OpenAI API"));
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn test_missing_key_makes_no_requests() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::with_settings(
        JobClient::new(backend.clone()),
        SettingsStore::new(temp_dir.path()),
        Settings::default(),
    );

    let err = session
        .process_text("text", "p", |_| {}, TICK, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_cancelling_spawned_run_stops_polls() {
    let backend = Arc::new(FakeBackend::default());
    let client = JobClient::new(backend.clone());
    let job_id = client.submit("slow job", "p", &settings("sk")).await.unwrap();

    let progress_calls = Arc::new(AtomicUsize::new(0));
    let counter = progress_calls.clone();
    let running = client.spawn_run(
        job_id,
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        Duration::from_secs(3600),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    running.cancel();
    let err = running.wait().await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(progress_calls.load(Ordering::SeqCst), 0);
    // only the submission reached the server
    assert_eq!(backend.request_count(), 1);
}

/// A server that accepts connections but never answers
struct SilentBackend;

#[async_trait]
impl Transport for SilentBackend {
    async fn post_json(&self, _path: &str, _body: &Value) -> Result<HttpReply, TransportError> {
        std::future::pending().await
    }

    async fn get(&self, _path: &str) -> Result<HttpReply, TransportError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_cancel_interrupts_hung_connection_check() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::with_settings(
        JobClient::new(Arc::new(SilentBackend)),
        SettingsStore::new(temp_dir.path()),
        settings("sk"),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        session.process_text("text", "p", |_| {}, TICK, &cancel),
    )
    .await
    .expect("process_text should return once cancelled");
    assert!(outcome.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_cancel_while_waiting_for_server() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = Session::with_settings(
        JobClient::new(Arc::new(SilentBackend)),
        SettingsStore::new(temp_dir.path()),
        settings("sk"),
    );

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        session.process_text("text", "p", |_| {}, TICK, &cancel),
    )
    .await
    .expect("process_text should return once cancelled");
    assert!(outcome.unwrap_err().is_cancelled());
    assert!(session.last_result().is_none());
}

#[tokio::test]
async fn test_settings_updates_persist() {
    let temp_dir = TempDir::new().unwrap();
    let store = SettingsStore::new(temp_dir.path());
    let mut session = Session::open(
        JobClient::new(Arc::new(FakeBackend::default())),
        store,
    )
    .unwrap();

    session
        .update_settings(|s| {
            s.api_key = "sk-new".to_string();
            s.max_workers = 42;
        })
        .unwrap();
    assert_eq!(session.settings().max_workers, 10);

    let reloaded = SettingsStore::new(temp_dir.path()).load().unwrap();
    assert_eq!(&reloaded, session.settings());
}

#[tokio::test]
async fn test_corrupt_settings_can_be_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let store = SettingsStore::new(temp_dir.path());
    std::fs::write(store.path(), "{ truncated").unwrap();

    let backend = Arc::new(FakeBackend::default());
    let strict = Session::open(
        JobClient::new(backend.clone()),
        SettingsStore::new(temp_dir.path()),
    );
    assert!(strict.is_err());

    let mut session = Session::open_or_default(JobClient::new(backend), store);
    assert_eq!(session.settings(), &Settings::default());

    session
        .update_settings(|s| s.api_key = "sk-fresh".to_string())
        .unwrap();

    let reloaded = SettingsStore::new(temp_dir.path()).load().unwrap();
    assert_eq!(reloaded.api_key, "sk-fresh");
    assert_eq!(reloaded.max_workers, 5);
}
