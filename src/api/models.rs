use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ConnectionCheckRequest<'a> {
    pub api_key: &'a str,
    pub base_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProcessTextRequest<'a> {
    pub text: &'a str,
    pub prompt: &'a str,
    pub api_key: &'a str,
    pub base_url: &'a str,
    pub model: &'a str,
    pub max_workers: u32,
    pub session_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ProcessTextResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned by the server on non-2xx responses. `detail` is a
/// string for handled errors and a list of field errors for rejected
/// request bodies.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        let message = match &self.detail {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(describe_field_error)
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        };
        Some(message).filter(|m| !m.is_empty())
    }
}

/// `body.max_workers: value is not a valid integer`
fn describe_field_error(item: &Value) -> String {
    let Some(msg) = item.get("msg").and_then(Value::as_str) else {
        return match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    };

    let location = item
        .get("loc")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .map(|p| match p {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default();

    if location.is_empty() {
        msg.to_string()
    } else {
        format!("{}: {}", location, msg)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Job lifecycle state. The server's own vocabulary (`splitting`,
/// `processing`, `error`) is accepted alongside the canonical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "splitting", alias = "queued")]
    Pending,
    #[serde(alias = "processing")]
    Running,
    Completed,
    #[serde(alias = "error")]
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    status: JobStatus,
    #[serde(default)]
    completed_chunks: u64,
    #[serde(default)]
    total_chunks: u64,
    #[serde(default)]
    results: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// One status fetch. `result` is only set for completed jobs and `error`
/// only for failed ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawStatus")]
pub struct JobStatusSnapshot {
    pub status: JobStatus,
    pub completed_units: u64,
    pub total_units: u64,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl From<RawStatus> for JobStatusSnapshot {
    fn from(raw: RawStatus) -> Self {
        let result = match raw.status {
            JobStatus::Completed => Some(raw.results.unwrap_or_default()),
            _ => None,
        };
        let error = match raw.status {
            JobStatus::Failed => raw.error.filter(|e| !e.is_empty()),
            _ => None,
        };

        Self {
            status: raw.status,
            completed_units: raw.completed_chunks,
            total_units: raw.total_chunks,
            result,
            error,
        }
    }
}

impl JobStatusSnapshot {
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed_units,
            total: self.total_units,
        }
    }
}

/// Units done out of units known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
}

impl Progress {
    /// Rounded percentage, or `None` while the total is still unknown
    pub fn percentage(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = (self.completed as f64 / self.total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}
