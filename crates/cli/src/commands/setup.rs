//! Store setup check.
//!
//! # Usage
//!
//! ```bash
//! qs-cli setup check
//! ```
//!
//! Exits non-zero when any problem is found, so it can gate a deploy.

use quayside_admin::SetupReport;

use super::{CommandError, connect};

/// Check that the store is configured to take orders.
///
/// # Errors
///
/// Returns `CommandError::SetupIncomplete` if the report lists problems, or
/// an error if the Admin API cannot be reached.
pub async fn check() -> Result<(), CommandError> {
    let (config, client, mut session) = connect().await?;

    let report = client
        .setup_report(&mut session, &config.payment_method_code)
        .await?;
    summarize(&report);

    verdict(&report)
}

fn summarize(report: &SetupReport) {
    tracing::info!(
        "Channel '{}': {} zone(s), {} shipping method(s), {} payment method(s)",
        report.channel.code,
        report.zones.len(),
        report.shipping_methods.len(),
        report.payment_methods.len()
    );
    for method in &report.shipping_methods {
        tracing::info!(
            "  shipping: {} ({}) checker={} calculator={}",
            method.name,
            method.code,
            method.checker.code,
            method.calculator.code
        );
    }
}

fn verdict(report: &SetupReport) -> Result<(), CommandError> {
    let problems = report.problems();
    if problems.is_empty() {
        tracing::info!("Store setup looks complete");
        return Ok(());
    }
    for problem in &problems {
        tracing::warn!("{problem}");
    }
    Err(CommandError::SetupIncomplete(problems.len()))
}
