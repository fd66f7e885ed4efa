//! CLI command implementations.

pub mod search;
pub mod setup;

use quayside_admin::config::ConfigError;
use quayside_admin::{AdminClient, AdminConfig, AdminError, AdminSession};
use quayside_core::{JobId, JobState};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    /// The setup check found problems.
    #[error("Store setup has {0} problem(s)")]
    SetupIncomplete(usize),

    /// A background job finished without completing.
    #[error("Job {id} {state}")]
    JobUnsuccessful { id: JobId, state: JobState },
}

/// Load config, build a client and log in.
async fn connect() -> Result<(AdminConfig, AdminClient, AdminSession), CommandError> {
    let config = AdminConfig::from_env()?;
    tracing::info!("Connecting to Admin API at {}", config.api_url);

    let client = AdminClient::new(&config)?;
    let session = client.login(&config.username, &config.password).await?;
    Ok((config, client, session))
}
