//! Admin API error types.

use std::time::Duration;

use thiserror::Error;

use quayside_core::{ErrorResult, JobId, JobState};

use crate::config::ConfigError;

/// Errors that can occur when talking to the Admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the engine.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The engine refused the credentials.
    #[error("Login rejected ({}): {}", .0.error_code, .0.message)]
    LoginRejected(ErrorResult),

    /// Login succeeded but the engine did not issue a session token.
    #[error("Login succeeded but no auth token was returned")]
    MissingToken,

    /// The session token is missing, expired or lacks permissions.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The job queue has no job with this ID.
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    /// The job did not finish in time.
    #[error("Job {id} still {state} after {}s", .waited.as_secs())]
    JobTimeout {
        id: JobId,
        state: JobState,
        waited: Duration,
    },
}
