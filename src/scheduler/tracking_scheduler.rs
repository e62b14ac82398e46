use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::job::{InFlight, Job, JobInfo, JobStatus};
use crate::database::models::{NewPricePoint, PricePoint};
use crate::database::repositories::PriceRepository;
use crate::errors::{TrackerError, TrackerResult};
use crate::finnhub::QuoteFetcher;
use crate::symbols::SymbolService;

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub job_id: String,
    /// A job was already registered; nothing new was scheduled
    pub already_tracking: bool,
}

/// Body of one tracking tick: fetch a quote, store it, stamp the symbol
#[derive(Clone)]
struct FetchCycle {
    symbols: SymbolService,
    fetcher: Arc<dyn QuoteFetcher>,
    prices: Arc<dyn PriceRepository>,
}

impl FetchCycle {
    async fn run(&self, symbol: &str) -> TrackerResult<PricePoint> {
        let quote = self.fetcher.fetch_quote(symbol).await?;
        let point = self.prices.append(NewPricePoint::from(&quote))?;
        self.symbols.update_last_checked(symbol).await?;
        Ok(point)
    }

    /// Run unless a cycle for the same symbol is still in flight.
    /// Failures are logged and swallowed.
    async fn run_guarded(&self, symbol: &str, in_flight: &InFlight) -> Option<PricePoint> {
        let Some(_guard) = in_flight.try_enter() else {
            tracing::debug!("Previous cycle for {} still running, skipping tick", symbol);
            return None;
        };

        match self.run(symbol).await {
            Ok(point) => {
                tracing::debug!("Stored price {} for {}", point.price, symbol);
                Some(point)
            }
            Err(e) => {
                tracing::error!("Failed to fetch price for {}: {}", symbol, e);
                None
            }
        }
    }
}

/// Held while a start or stop for one symbol is in progress
///
/// On drop the symbol's mutex is evicted from the registry once nobody else
/// holds or waits on it.
struct SymbolLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    symbol: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SymbolLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.symbol, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Owns one recurring fetch job per tracked symbol
///
/// Start and stop are serialized per symbol, so concurrent starts for the
/// same symbol cannot both schedule a job. Jobs for different symbols run
/// independently.
pub struct TrackingScheduler {
    cycle: FetchCycle,
    jobs: DashMap<String, Job>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TrackingScheduler {
    pub fn new(
        symbols: SymbolService,
        fetcher: Arc<dyn QuoteFetcher>,
        prices: Arc<dyn PriceRepository>,
    ) -> Self {
        Self {
            cycle: FetchCycle {
                symbols,
                fetcher,
                prices,
            },
            jobs: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    async fn lock_symbol(&self, symbol: &str) -> SymbolLock<'_> {
        let lock = self
            .locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        SymbolLock {
            locks: &self.locks,
            symbol: symbol.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Start tracking `symbol`
    ///
    /// Registers the symbol if needed, schedules the recurring job and runs
    /// one cycle before returning. Repeated calls return the existing job.
    pub async fn start(&self, symbol: &str) -> TrackerResult<StartOutcome> {
        self.cycle.symbols.validate_format(symbol)?;

        let _lock = self.lock_symbol(symbol).await;

        if let Some(job) = self.jobs.get(symbol) {
            tracing::info!("Already tracking {}", symbol);
            return Ok(StartOutcome {
                job_id: job.job_id.clone(),
                already_tracking: true,
            });
        }

        let record = self.cycle.symbols.create(symbol).await?;
        let interval = interval_from_ms(record.check_interval_ms);

        let job = self.spawn_job(symbol, interval, Instant::now() + interval);
        let job_id = job.job_id.clone();
        let in_flight = job.in_flight.clone();
        self.jobs.insert(symbol.to_string(), job);

        tracing::info!("Started tracking {} every {:?} (job {})", symbol, interval, job_id);

        // First sample, so the first read after start is not empty
        self.cycle.run_guarded(symbol, &in_flight).await;

        Ok(StartOutcome {
            job_id,
            already_tracking: false,
        })
    }

    /// Stop the job for `symbol`; the symbol stays registered and its
    /// history stays queryable
    ///
    /// The stop is recorded on the symbol so `resume_active` skips it.
    pub async fn stop(&self, symbol: &str) -> TrackerResult<()> {
        self.cycle.symbols.validate_format(symbol)?;

        let _lock = self.lock_symbol(symbol).await;

        if !self.jobs.contains_key(symbol) {
            return Err(TrackerError::NotFound(format!(
                "No tracking job found for {}",
                symbol
            )));
        }

        self.cycle.symbols.pause(symbol).await?;

        if let Some((_, job)) = self.jobs.remove(symbol) {
            job.cancel();
        }
        tracing::info!("Stopped tracking {}", symbol);
        Ok(())
    }

    /// Run one fetch-and-store cycle now
    ///
    /// Returns the stored point, or `None` when the cycle failed or another
    /// cycle for the symbol was in flight.
    pub async fn fetch_and_store(&self, symbol: &str) -> Option<PricePoint> {
        let in_flight = self
            .jobs
            .get(symbol)
            .map(|job| job.in_flight.clone())
            .unwrap_or_default();

        self.cycle.run_guarded(symbol, &in_flight).await
    }

    pub fn list_active_jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self.jobs.iter().map(|job| job.info()).collect();
        jobs.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        jobs
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn job_status(&self, symbol: &str) -> JobStatus {
        if self.jobs.contains_key(symbol) {
            JobStatus::Active
        } else {
            JobStatus::Unknown
        }
    }

    /// Schedule jobs for every active registry entry without a job
    ///
    /// Used at boot so tracking survives restarts. Symbols whose job was
    /// stopped stay stopped. Symbols are not re-validated upstream and each
    /// job samples immediately.
    pub async fn resume_active(&self) -> TrackerResult<usize> {
        let mut resumed = 0;

        for record in self.cycle.symbols.list_active().await? {
            if record.is_paused {
                tracing::debug!("Not resuming {}: tracking was stopped", record.symbol);
                continue;
            }

            let _lock = self.lock_symbol(&record.symbol).await;

            if self.jobs.contains_key(&record.symbol) {
                continue;
            }

            let interval = interval_from_ms(record.check_interval_ms);
            let job = self.spawn_job(&record.symbol, interval, Instant::now());
            self.jobs.insert(record.symbol.clone(), job);
            resumed += 1;

            tracing::info!("Resumed tracking {} every {:?}", record.symbol, interval);
        }

        Ok(resumed)
    }

    /// Cancel every job and wait for the tasks to exit
    pub async fn stop_all(&self) -> usize {
        let symbols: Vec<String> = self.jobs.iter().map(|job| job.key().clone()).collect();
        let mut stopped = 0;

        for symbol in symbols {
            if let Some((_, job)) = self.jobs.remove(&symbol) {
                job.shutdown().await;
                stopped += 1;
            }
        }

        tracing::info!("Stopped {} tracking jobs", stopped);
        stopped
    }

    fn spawn_job(&self, symbol: &str, interval: Duration, first_tick: Instant) -> Job {
        let cancel = CancellationToken::new();
        let in_flight = InFlight::default();

        let token = cancel.clone();
        let guard = in_flight.clone();
        let cycle = self.cycle.clone();
        let task_symbol = symbol.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        cycle.run_guarded(&task_symbol, &guard).await;
                    }
                }
            }

            tracing::debug!("Tracking task for {} exited", task_symbol);
        });

        Job::new(symbol, interval, in_flight, cancel, handle)
    }
}

fn interval_from_ms(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0).max(1))
}
