//! Search index maintenance.
//!
//! # Usage
//!
//! ```bash
//! qs-cli search reindex --timeout-secs 300
//! ```

use std::time::Duration;

use quayside_admin::Job;
use quayside_core::JobState;

use super::{CommandError, connect};

/// Start a reindex and wait for it to finish.
///
/// # Errors
///
/// Returns `CommandError::JobUnsuccessful` if the job fails or is cancelled,
/// and `AdminError::JobTimeout` if it outlives `timeout`.
pub async fn reindex(timeout: Duration) -> Result<(), CommandError> {
    let (_config, client, mut session) = connect().await?;

    let job = client.reindex(&mut session).await?;
    tracing::info!(
        "Waiting up to {}s for job {} ({})",
        timeout.as_secs(),
        job.id,
        job.queue_name
    );

    let job = client.await_job(&mut session, &job.id, timeout).await?;
    outcome(job)
}

fn outcome(job: Job) -> Result<(), CommandError> {
    match job.state {
        JobState::Completed => {
            tracing::info!("Search index rebuilt (job {})", job.id);
            Ok(())
        }
        state => {
            if let Some(error) = &job.error {
                tracing::warn!("Job {} reported: {error}", job.id);
            }
            Err(CommandError::JobUnsuccessful { id: job.id, state })
        }
    }
}
