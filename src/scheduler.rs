//! Background maintenance jobs.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use crate::cooldown::CooldownTracker;

/// Cron line for the expired-cooldown sweep (every 5 minutes).
const SWEEP_SCHEDULE: &str = "0 */5 * * * *";

/// Wrapper around tokio-cron-scheduler for background maintenance.
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Start a scheduler running the expired-cooldown sweep. Lazy purging
    /// only reclaims keys that get re-read; the sweep bounds memory for the
    /// rest.
    pub async fn with_cooldown_sweep(cooldowns: Arc<CooldownTracker>) -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;

        let job = Job::new_async(SWEEP_SCHEDULE, move |_uuid, _lock| {
            let cooldowns = Arc::clone(&cooldowns);
            Box::pin(async move {
                let purged = cooldowns.purge_expired().await;
                if purged > 0 {
                    debug!("Purged {} expired cooldown entries", purged);
                }
            })
        })
        .context("Failed to create cooldown sweep job")?;

        inner
            .add(job)
            .await
            .context("Failed to add cooldown sweep job")?;
        inner.start().await.context("Failed to start scheduler")?;

        info!("Scheduled cooldown sweep: {}", SWEEP_SCHEDULE);
        Ok(Self { inner })
    }

    /// Stop background jobs.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        Ok(())
    }
}
