use crate::cache::Cache;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Cache purge job
///
/// Runs every minute and drops expired entries from the cache store, so
/// keys that are never read again do not pile up in memory
#[derive(Clone)]
pub struct CachePurgeJob {
    cache: Cache,
}

impl CachePurgeJob {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Register this job with the scheduler
    ///
    /// Schedule: Every minute (0 * * * * *)
    pub async fn register(
        self,
        scheduler: &JobScheduler,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
            let purge_job = self.clone();

            Box::pin(async move {
                let purged = purge_job.run_now().await;
                if purged > 0 {
                    tracing::debug!("Cache purge job dropped {} expired entries", purged);
                }
            })
        })?;

        scheduler.add(job).await?;

        tracing::info!("✅ Cache purge job registered (runs every minute)");

        Ok(())
    }

    /// Purge immediately (manual trigger)
    pub async fn run_now(&self) -> usize {
        self.cache.purge_expired().await
    }
}
