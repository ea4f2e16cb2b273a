use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use textproc_client::api::{JobClient, JobError};
use textproc_client::config::settings::Settings;
use tokio_util::sync::CancellationToken;

type Jobs = Arc<Mutex<HashMap<String, (String, u32)>>>;

async fn test_connection(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["api_key"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "API key is required" })),
        );
    }
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn process_text(State(jobs): State<Jobs>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let id = body["session_id"].as_str().unwrap_or_default().to_string();
    let text = body["text"].as_str().unwrap_or_default().to_string();
    if body["max_workers"].as_u64().unwrap_or(0) > 10 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "max_workers out of range" })),
        );
    }
    jobs.lock().unwrap().insert(id.clone(), (text, 0));
    (
        StatusCode::OK,
        Json(json!({ "success": true, "session_id": id, "message": "Processing started" })),
    )
}

async fn processing_status(
    State(jobs): State<Jobs>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let mut jobs = jobs.lock().unwrap();
    let Some((text, polls)) = jobs.get_mut(&session_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Session not found" })),
        );
    };
    *polls += 1;

    let body = if *polls >= 2 {
        json!({
            "success": true, "status": "completed", "progress": 100,
            "total_chunks": 2, "completed_chunks": 2,
            "results": format!("{}\n\n{}", text, text), "error": null
        })
    } else {
        json!({
            "success": true, "status": "processing", "progress": 50,
            "total_chunks": 2, "completed_chunks": 1, "results": "", "error": null
        })
    };
    (StatusCode::OK, Json(body))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": 1700000000.0 }))
}

async fn spawn_server() -> String {
    let jobs: Jobs = Arc::new(Mutex::new(HashMap::new()));
    let app = Router::new()
        .route("/api/test-connection", post(test_connection))
        .route("/api/process-text", post(process_text))
        .route("/api/processing-status/:session_id", get(processing_status))
        .route("/api/health", get(health))
        .with_state(jobs);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn settings() -> Settings {
    Settings {
        api_key: "sk-local".to_string(),
        max_workers: 10,
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_full_job_over_http() {
    let server = spawn_server().await;
    let client = JobClient::http(&server).unwrap();

    assert_eq!(client.health().await.unwrap().status, "healthy");
    client.verify_connectivity(&settings()).await.unwrap();

    let job_id = client.submit("line", "repeat", &settings()).await.unwrap();
    let mut progress = Vec::new();
    let result = client
        .run_to_completion(
            &job_id,
            |p| progress.push(p.percentage()),
            Duration::from_millis(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result, "line\n\nline");
    assert_eq!(progress, vec![Some(50), Some(100)]);
}

#[tokio::test]
async fn test_server_detail_reaches_caller() {
    let server = spawn_server().await;
    let client = JobClient::http(&server).unwrap();

    let err = client
        .verify_connectivity(&Settings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Connectivity(ref m) if m == "API key is required"));

    let err = client.poll_status("999").await.unwrap_err();
    assert!(matches!(err, JobError::Status(ref m) if m == "Session not found"));
}

#[tokio::test]
async fn test_unreachable_server_is_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = JobClient::http(&format!("http://{}", addr)).unwrap();
    let err = client.verify_connectivity(&settings()).await.unwrap_err();
    assert!(matches!(err, JobError::Connectivity(_)));
}
