//! Error types for the job API

use std::fmt;
use thiserror::Error;

/// Which local input failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    Prompt,
    ApiKey,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text => write!(f, "Text"),
            Field::Prompt => write!(f, "Prompt"),
            Field::ApiKey => write!(f, "API key"),
        }
    }
}

/// Failure at the transport seam, before any HTTP status is known
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    /// Bad local input. Never sent over the network.
    #[error("{0} is required")]
    Validation(Field),

    /// The pre-flight connection check failed
    #[error("{0}")]
    Connectivity(String),

    /// The server rejected job creation
    #[error("{0}")]
    Submission(String),

    /// A single status fetch failed
    #[error("{0}")]
    Status(String),

    /// The job reached the failed state, or polling hit a status error
    #[error("{0}")]
    Processing(String),

    /// The caller stopped observing the job
    #[error("Job observation cancelled")]
    Cancelled,
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}
