use std::sync::Arc;

use chrono::Utc;

use super::symbol_cache::SymbolCache;
use super::validation;
use crate::database::models::{NewTrackedSymbol, TrackedSymbol, TrackedSymbolUpdate};
use crate::database::repositories::SymbolRepository;
use crate::errors::{TrackerError, TrackerResult};
use crate::finnhub::QuoteFetcher;

/// Registry of tracked symbols with cache-aside existence and validation lookups
#[derive(Clone)]
pub struct SymbolService {
    repository: Arc<dyn SymbolRepository>,
    fetcher: Arc<dyn QuoteFetcher>,
    cache: SymbolCache,
    default_interval_ms: i64,
}

impl SymbolService {
    pub fn new(
        repository: Arc<dyn SymbolRepository>,
        fetcher: Arc<dyn QuoteFetcher>,
        cache: SymbolCache,
        default_interval_ms: i64,
    ) -> Self {
        Self {
            repository,
            fetcher,
            cache,
            default_interval_ms,
        }
    }

    pub fn validate_format(&self, symbol: &str) -> TrackerResult<()> {
        validation::validate_format(symbol)
    }

    /// Whether the price feed knows `symbol`
    ///
    /// Answers are cached for an hour. Only rejections of the symbol itself
    /// count as `false`; auth, rate-limit and availability failures are
    /// returned as errors and left uncached.
    pub async fn exists_upstream(&self, symbol: &str) -> TrackerResult<bool> {
        self.validate_format(symbol)?;

        if let Some(cached) = self.cache.cached_validation(symbol).await {
            tracing::debug!("Symbol {} validation result from cache: {}", symbol, cached);
            return Ok(cached);
        }

        let valid = match self.fetcher.fetch_quote(symbol).await {
            Ok(_) => true,
            Err(e) if e.kind.is_symbol_rejection() => {
                tracing::debug!("Symbol {} rejected upstream: {}", symbol, e);
                false
            }
            Err(e) => return Err(e.into()),
        };

        self.cache.set_validation(symbol, valid).await;
        Ok(valid)
    }

    /// Register `symbol` for tracking
    ///
    /// An inactive record is reactivated without asking the price feed again.
    pub async fn create(&self, symbol: &str) -> TrackerResult<TrackedSymbol> {
        self.validate_format(symbol)?;

        if let Some(existing) = self.repository.find(symbol)? {
            if existing.is_active {
                return Err(TrackerError::Conflict(format!(
                    "Symbol {} is already being tracked",
                    symbol
                )));
            }

            let reactivated = self
                .repository
                .update(symbol, TrackedSymbolUpdate::activate())?
                .ok_or_else(|| not_found(symbol))?;
            self.cache.invalidate(symbol).await;

            tracing::info!("Reactivated symbol {}", symbol);
            return Ok(reactivated);
        }

        if !self.exists_upstream(symbol).await? {
            return Err(not_found(symbol));
        }

        let created = self
            .repository
            .insert(NewTrackedSymbol::new(symbol).with_interval(self.default_interval_ms))?;
        self.cache.invalidate(symbol).await;

        tracing::info!("Created symbol configuration for {}", symbol);
        Ok(created)
    }

    /// Read a tracked symbol, short-circuiting on a cached miss
    pub async fn get(&self, symbol: &str) -> TrackerResult<TrackedSymbol> {
        self.validate_format(symbol)?;

        if self.cache.cached_existence(symbol).await == Some(false) {
            return Err(not_found(symbol));
        }

        match self.repository.find(symbol)? {
            Some(record) => {
                self.cache.set_existence(symbol, true).await;
                Ok(record)
            }
            None => {
                self.cache.set_existence(symbol, false).await;
                Err(not_found(symbol))
            }
        }
    }

    pub async fn update(
        &self,
        symbol: &str,
        update: TrackedSymbolUpdate,
    ) -> TrackerResult<TrackedSymbol> {
        let existing = self.get(symbol).await?;
        if update.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .repository
            .update(symbol, update)?
            .ok_or_else(|| not_found(symbol))?;
        self.cache.invalidate(symbol).await;

        Ok(updated)
    }

    pub async fn deactivate(&self, symbol: &str) -> TrackerResult<TrackedSymbol> {
        self.update(symbol, TrackedSymbolUpdate::deactivate()).await
    }

    /// Record that tracking of `symbol` was stopped
    pub async fn pause(&self, symbol: &str) -> TrackerResult<()> {
        self.repository.update(symbol, TrackedSymbolUpdate::pause())?;
        self.cache.invalidate(symbol).await;
        Ok(())
    }

    pub async fn update_last_checked(&self, symbol: &str) -> TrackerResult<()> {
        self.repository.update_last_checked(symbol, Utc::now())?;
        Ok(())
    }

    pub async fn list_active(&self) -> TrackerResult<Vec<TrackedSymbol>> {
        Ok(self.repository.find_all(Some(true))?)
    }

    pub async fn list_all(&self) -> TrackerResult<Vec<TrackedSymbol>> {
        Ok(self.repository.find_all(None)?)
    }

    /// Whether the registry holds a record, active or not
    pub async fn symbol_exists(&self, symbol: &str) -> TrackerResult<bool> {
        self.validate_format(symbol)?;
        Ok(self.repository.exists(symbol)?)
    }
}

fn not_found(symbol: &str) -> TrackerError {
    TrackerError::NotFound(format!("Symbol {} not found", symbol))
}
