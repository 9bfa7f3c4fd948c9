//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The engine's re-matching correctness depends on pending offers actually
//! expiring, so the sweeper runs frequently. `expire_due_matches` is
//! idempotent; overlapping or duplicate firings are harmless.

use std::sync::Arc;

use anyhow::Result;
use engine_core::Engine;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Start the match-expiry sweeper, firing every `every_seconds` seconds.
pub async fn start_expiry_sweeper(
    engine: Arc<Engine>,
    every_seconds: u32,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let schedule = format!("*/{every_seconds} * * * * *");
    let sweep_engine = engine.clone();
    let sweep_job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let engine = sweep_engine.clone();
        Box::pin(async move {
            if let Err(e) = engine.expire_due_matches().await {
                tracing::error!("Expiry sweep failed: {}", e);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!(every_seconds, "Match-expiry sweeper started");
    Ok(scheduler)
}
