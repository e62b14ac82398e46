use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use super::models::{
    DetailedAnalytics, PriceHistoryEntry, StartTrackingResponse, StockSummary, SystemStats,
    TrackedSymbolView, TrackingInfo,
};
use super::system_stats::{self, Uptime};
use crate::cache::Cache;
use crate::database::models::{PricePoint, TrackedSymbol};
use crate::database::repositories::{PriceRepository, DEFAULT_WINDOW};
use crate::errors::{TrackerError, TrackerResult};
use crate::scheduler::TrackingScheduler;
use crate::symbols::SymbolService;

const PRICE_CACHE_PREFIX: &str = "stock:price:";

/// Tracked symbol with its latest price and moving-average window
struct Snapshot {
    record: TrackedSymbol,
    latest: PricePoint,
    moving_average: Decimal,
    history: Vec<PriceHistoryEntry>,
}

/// Read path over stored prices, plus the start/stop entry points
#[derive(Clone)]
pub struct StockService {
    scheduler: Arc<TrackingScheduler>,
    symbols: SymbolService,
    prices: Arc<dyn PriceRepository>,
    cache: Cache,
    summary_ttl: Duration,
    uptime: Uptime,
}

impl StockService {
    pub fn new(
        scheduler: Arc<TrackingScheduler>,
        symbols: SymbolService,
        prices: Arc<dyn PriceRepository>,
        cache: Cache,
        summary_ttl: Duration,
    ) -> Self {
        Self {
            scheduler,
            symbols,
            prices,
            cache,
            summary_ttl,
            uptime: Uptime::start(),
        }
    }

    fn cache_key(symbol: &str) -> String {
        format!("{PRICE_CACHE_PREFIX}{symbol}")
    }

    pub async fn start_tracking(&self, symbol: &str) -> TrackerResult<StartTrackingResponse> {
        self.symbols.validate_format(symbol)?;

        let outcome = self.scheduler.start(symbol).await?;
        let message = if outcome.already_tracking {
            format!("Already tracking {}", symbol)
        } else {
            format!("Started tracking {}", symbol)
        };

        Ok(StartTrackingResponse {
            job_id: outcome.job_id,
            message,
        })
    }

    /// Latest price, moving average and last 10 prices, cached briefly
    pub async fn get_summary(&self, symbol: &str) -> TrackerResult<StockSummary> {
        self.symbols.validate_format(symbol)?;

        self.cache
            .get_or_try_insert_with(&Self::cache_key(symbol), self.summary_ttl, || async {
                let snapshot = self.snapshot(symbol).await?;
                Ok::<_, TrackerError>(StockSummary {
                    symbol: symbol.to_string(),
                    current_price: snapshot.latest.price,
                    last_updated: snapshot.latest.timestamp,
                    moving_average: snapshot.moving_average,
                    price_history: snapshot.history,
                })
            })
            .await
    }

    /// Summary plus job status and the intraday placeholder fields
    pub async fn get_detailed(&self, symbol: &str) -> TrackerResult<DetailedAnalytics> {
        self.symbols.validate_format(symbol)?;

        let Snapshot {
            record,
            latest,
            moving_average,
            history,
        } = self.snapshot(symbol).await?;

        Ok(DetailedAnalytics {
            symbol: symbol.to_string(),
            current_price: latest.price,
            last_updated: latest.timestamp,
            moving_average,
            price_change: Decimal::ZERO,
            percent_change: Decimal::ZERO,
            high_24h: latest.price,
            low_24h: latest.price,
            volume_24h: latest.volume.unwrap_or(0),
            price_history: history,
            tracking: TrackingInfo {
                is_active: record.is_active,
                check_interval: record.check_interval_ms,
                last_checked: record.last_checked_at,
                job_status: self.scheduler.job_status(symbol),
                error_count: 0,
                last_error: None,
            },
        })
    }

    /// Stop the job and drop the cached summary
    pub async fn stop_and_clear(&self, symbol: &str) -> TrackerResult<String> {
        self.symbols.validate_format(symbol)?;

        self.scheduler.stop(symbol).await?;
        self.cache.delete(&Self::cache_key(symbol)).await;

        Ok(format!("Stopped tracking {}", symbol))
    }

    pub async fn tracked_symbols(&self) -> TrackerResult<Vec<TrackedSymbolView>> {
        let symbols = self.symbols.list_active().await?;

        Ok(symbols
            .iter()
            .map(|record| TrackedSymbolView::new(record, self.scheduler.job_status(&record.symbol)))
            .collect())
    }

    pub fn active_jobs(&self) -> usize {
        self.scheduler.job_count()
    }

    pub async fn system_stats(&self) -> TrackerResult<SystemStats> {
        Ok(SystemStats {
            active_jobs: self.active_jobs(),
            total_symbols: self.symbols.list_all().await?.len(),
            total_prices: self.prices.count(None)?,
            uptime: self.uptime.seconds(),
            memory_usage: system_stats::memory_usage(),
        })
    }

    async fn snapshot(&self, symbol: &str) -> TrackerResult<Snapshot> {
        let record = self.symbols.get(symbol).await?;

        let latest = self.prices.latest(symbol)?.ok_or_else(|| {
            TrackerError::NotFound(format!("No data available for symbol {}", symbol))
        })?;

        let moving_average = self
            .prices
            .moving_average(symbol, DEFAULT_WINDOW)?
            .unwrap_or(Decimal::ZERO);

        let history = self
            .prices
            .recent(symbol, DEFAULT_WINDOW)?
            .iter()
            .map(PriceHistoryEntry::from)
            .collect();

        Ok(Snapshot {
            record,
            latest,
            moving_average,
            history,
        })
    }
}
