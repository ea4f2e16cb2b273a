use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;

/// Fixed key the settings record is stored under
pub const STORAGE_KEY: &str = "textProcessorSettings";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_WORKERS: u32 = 5;
pub const MIN_WORKERS: u32 = 1;
pub const MAX_WORKERS: u32 = 10;

/// User preferences forwarded with every job.
///
/// Field names are camelCase on disk so records written by older clients
/// keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Credential forwarded to the model provider
    pub api_key: String,

    /// Model provider endpoint
    pub base_url: String,

    pub model: String,

    /// Parallel chunk workers on the server, always within [1, 10]
    pub max_workers: u32,

    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            dark_mode: false,
        }
    }
}

impl Settings {
    /// Merge a stored record over the defaults. Missing or ill-typed fields
    /// keep their default; unknown fields are ignored.
    pub fn merged_over_defaults(stored: &Value) -> Result<Self> {
        let obj = stored
            .as_object()
            .ok_or_else(|| anyhow!("Stored settings are not a JSON object"))?;

        let mut settings = Self::default();

        if let Some(v) = obj.get("apiKey").and_then(Value::as_str) {
            settings.api_key = v.to_string();
        }
        if let Some(v) = obj.get("baseUrl").and_then(Value::as_str) {
            settings.base_url = v.to_string();
        }
        if let Some(v) = obj.get("model").and_then(Value::as_str) {
            settings.model = v.to_string();
        }
        if let Some(v) = obj.get("maxWorkers") {
            settings.max_workers = worker_limit_from_value(v);
        }
        if let Some(v) = obj.get("darkMode").and_then(Value::as_bool) {
            settings.dark_mode = v;
        }

        Ok(settings.validated())
    }

    /// Normalise fields to the ranges the job client accepts
    pub fn validated(mut self) -> Self {
        self.max_workers = self.max_workers.clamp(MIN_WORKERS, MAX_WORKERS);

        let model = self.model.trim();
        self.model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };

        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// API key with all but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

/// Clamp any integer into the worker range
pub fn clamp_worker_limit(value: i64) -> u32 {
    value.clamp(MIN_WORKERS as i64, MAX_WORKERS as i64) as u32
}

/// Parse user-entered worker counts. Non-numeric input falls back to the
/// default; numbers are clamped.
pub fn parse_worker_limit(input: &str) -> u32 {
    let input = input.trim();
    if let Ok(n) = input.parse::<i64>() {
        return clamp_worker_limit(n);
    }
    match input.parse::<f64>() {
        Ok(f) if f.is_finite() => clamp_worker_limit(f.trunc() as i64),
        _ => DEFAULT_MAX_WORKERS,
    }
}

fn worker_limit_from_value(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(clamp_worker_limit)
            .unwrap_or(DEFAULT_MAX_WORKERS),
        Value::String(s) => parse_worker_limit(s),
        _ => DEFAULT_MAX_WORKERS,
    }
}
