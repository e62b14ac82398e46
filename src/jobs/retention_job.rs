use crate::database::connection::DatabaseError;
use crate::database::repositories::{PriceRepository, SymbolRepository};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Price retention job
///
/// Runs every hour and deletes price points older than the retention window
/// for every registered symbol, tracked or not
#[derive(Clone)]
pub struct RetentionJob {
    symbol_repository: Arc<dyn SymbolRepository>,
    price_repository: Arc<dyn PriceRepository>,
    retention: Duration,
}

impl RetentionJob {
    /// Create a new retention job keeping `retention_days` of history
    pub fn new(
        symbol_repository: Arc<dyn SymbolRepository>,
        price_repository: Arc<dyn PriceRepository>,
        retention_days: i64,
    ) -> Self {
        Self {
            symbol_repository,
            price_repository,
            retention: Duration::days(retention_days),
        }
    }

    /// Delete expired points; returns the number of rows removed
    fn purge(&self) -> Result<usize, DatabaseError> {
        let cutoff = Utc::now() - self.retention;
        let mut deleted = 0;

        for symbol in self.symbol_repository.find_all(None)? {
            let removed = self
                .price_repository
                .purge_older_than(&symbol.symbol, cutoff)?;

            if removed > 0 {
                tracing::debug!("Purged {} prices for {}", removed, symbol.symbol);
            }
            deleted += removed;
        }

        Ok(deleted)
    }

    /// Register this job with the scheduler
    ///
    /// Schedule: Every hour (0 0 * * * *)
    pub async fn register(
        self,
        scheduler: &JobScheduler,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
            let retention_job = self.clone();

            Box::pin(async move {
                match retention_job.purge() {
                    Ok(deleted) => {
                        tracing::info!("Price retention job completed: {} rows purged", deleted)
                    }
                    Err(e) => tracing::error!("Price retention job failed: {}", e),
                }
            })
        })?;

        scheduler.add(job).await?;

        tracing::info!("✅ Price retention job registered (runs every hour)");

        Ok(())
    }

    /// Run the purge immediately (manual trigger)
    pub fn run_now(&self) -> Result<usize, DatabaseError> {
        self.purge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewPricePoint, NewTrackedSymbol};
    use crate::database::repositories::{InMemoryPriceRepository, InMemorySymbolRepository};
    use rust_decimal_macros::dec;

    #[test]
    fn test_purges_only_expired_points() {
        let symbols = Arc::new(InMemorySymbolRepository::new());
        let prices = Arc::new(InMemoryPriceRepository::new());
        symbols.insert(NewTrackedSymbol::new("AAPL")).unwrap();
        symbols.insert(NewTrackedSymbol::new("MSFT")).unwrap();

        let now = Utc::now();
        prices
            .append(NewPricePoint::new("AAPL", dec!(100), now - Duration::days(45)))
            .unwrap();
        prices
            .append(NewPricePoint::new("AAPL", dec!(101), now - Duration::days(1)))
            .unwrap();
        prices
            .append(NewPricePoint::new("MSFT", dec!(400), now - Duration::days(31)))
            .unwrap();

        let job = RetentionJob::new(symbols, prices.clone(), 30);
        assert_eq!(job.run_now().unwrap(), 2);
        assert_eq!(prices.count(None).unwrap(), 1);
        assert_eq!(prices.latest("AAPL").unwrap().unwrap().price, dec!(101));
    }

    #[tokio::test]
    async fn test_register_with_scheduler() {
        let scheduler = JobScheduler::new().await.unwrap();
        let job = RetentionJob::new(
            Arc::new(InMemorySymbolRepository::new()),
            Arc::new(InMemoryPriceRepository::new()),
            30,
        );

        assert!(job.register(&scheduler).await.is_ok());
    }
}
