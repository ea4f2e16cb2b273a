//! Job API client
//!
//! Wire models, the HTTP transport seam, and the submit-and-poll client
//! built on top of them.

pub mod error;
pub mod job_client;
pub mod job_id;
pub mod models;
pub mod transport;

pub use error::{Field, JobError, TransportError};
pub use job_client::{JobClient, RunningJob, DEFAULT_POLL_INTERVAL_MS};
pub use models::{JobStatus, JobStatusSnapshot, Progress};
pub use transport::{HttpReply, HttpTransport, Transport};
