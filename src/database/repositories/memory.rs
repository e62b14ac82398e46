use crate::database::connection::DatabaseError;
use crate::database::models::{
    NewPricePoint, NewTrackedSymbol, PricePoint, PriceStats, TrackedSymbol, TrackedSymbolUpdate,
};
use crate::database::repositories::price_repository::PriceRepository;
use crate::database::repositories::symbol_repository::SymbolRepository;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Process-local SymbolRepository, used when no database is configured
#[derive(Default)]
pub struct InMemorySymbolRepository {
    symbols: RwLock<BTreeMap<String, TrackedSymbol>>,
}

impl InMemorySymbolRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SymbolRepository for InMemorySymbolRepository {
    fn find(&self, symbol: &str) -> Result<Option<TrackedSymbol>, DatabaseError> {
        Ok(self.symbols.read().get(symbol).cloned())
    }

    fn find_all(&self, is_active: Option<bool>) -> Result<Vec<TrackedSymbol>, DatabaseError> {
        let mut symbols: Vec<TrackedSymbol> = self
            .symbols
            .read()
            .values()
            .filter(|s| is_active.map_or(true, |active| s.is_active == active))
            .cloned()
            .collect();

        symbols.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(symbols)
    }

    fn insert(&self, new_symbol: NewTrackedSymbol) -> Result<TrackedSymbol, DatabaseError> {
        let mut symbols = self.symbols.write();

        if symbols.contains_key(&new_symbol.symbol) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate key value violates unique constraint: {}",
                new_symbol.symbol
            )));
        }

        let now = Utc::now();
        let record = TrackedSymbol {
            symbol: new_symbol.symbol.clone(),
            is_active: new_symbol.is_active,
            check_interval_ms: new_symbol.check_interval_ms,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
            is_paused: false,
        };
        symbols.insert(new_symbol.symbol, record.clone());

        Ok(record)
    }

    fn update(
        &self,
        symbol: &str,
        update: TrackedSymbolUpdate,
    ) -> Result<Option<TrackedSymbol>, DatabaseError> {
        let mut symbols = self.symbols.write();

        Ok(symbols.get_mut(symbol).map(|record| {
            update.apply_to(record);
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    fn update_last_checked(&self, symbol: &str, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        if let Some(record) = self.symbols.write().get_mut(symbol) {
            record.last_checked_at = Some(at);
        }
        Ok(())
    }

    fn exists(&self, symbol: &str) -> Result<bool, DatabaseError> {
        Ok(self.symbols.read().contains_key(symbol))
    }

    fn delete(&self, symbol: &str) -> Result<bool, DatabaseError> {
        Ok(self.symbols.write().remove(symbol).is_some())
    }
}

/// Process-local PriceRepository, used when no database is configured
#[derive(Default)]
pub struct InMemoryPriceRepository {
    points: RwLock<Vec<PricePoint>>,
    next_id: AtomicI64,
}

impl InMemoryPriceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points for symbol, most recent first
    fn sorted_for(&self, symbol: &str) -> Vec<PricePoint> {
        let mut points: Vec<PricePoint> = self
            .points
            .read()
            .iter()
            .filter(|p| p.symbol == symbol)
            .cloned()
            .collect();

        // Ties on timestamp keep insertion order reversed
        points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        points
    }
}

#[async_trait::async_trait]
impl PriceRepository for InMemoryPriceRepository {
    fn append(&self, point: NewPricePoint) -> Result<PricePoint, DatabaseError> {
        let record = PricePoint {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            symbol: point.symbol,
            price: point.price,
            volume: point.volume,
            timestamp: point.timestamp,
            created_at: Utc::now(),
        };

        self.points.write().push(record.clone());
        Ok(record)
    }

    fn latest(&self, symbol: &str) -> Result<Option<PricePoint>, DatabaseError> {
        Ok(self.sorted_for(symbol).into_iter().next())
    }

    fn recent(&self, symbol: &str, limit: i64) -> Result<Vec<PricePoint>, DatabaseError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self.sorted_for(symbol).into_iter().take(limit).collect())
    }

    fn range_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DatabaseError> {
        Ok(self
            .sorted_for(symbol)
            .into_iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .collect())
    }

    fn stats(&self, symbol: &str) -> Result<PriceStats, DatabaseError> {
        let points = self.sorted_for(symbol);
        if points.is_empty() {
            return Ok(PriceStats::empty());
        }

        let sum: Decimal = points.iter().map(|p| p.price).sum();
        Ok(PriceStats {
            avg: Some(sum / Decimal::from(points.len())),
            min: points.iter().map(|p| p.price).min(),
            max: points.iter().map(|p| p.price).max(),
            count: points.len() as i64,
        })
    }

    fn count(&self, symbol: Option<&str>) -> Result<i64, DatabaseError> {
        let points = self.points.read();
        let count = match symbol {
            Some(symbol) => points.iter().filter(|p| p.symbol == symbol).count(),
            None => points.len(),
        };
        Ok(count as i64)
    }

    fn purge_older_than(&self, symbol: &str, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let mut points = self.points.write();
        let before = points.len();
        points.retain(|p| !(p.symbol == symbol && p.timestamp < cutoff));
        Ok(before - points.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn seed(repo: &InMemoryPriceRepository, symbol: &str, prices: &[Decimal]) -> DateTime<Utc> {
        let base = Utc::now() - Duration::minutes(prices.len() as i64);
        for (i, price) in prices.iter().enumerate() {
            repo.append(NewPricePoint::new(
                symbol,
                *price,
                base + Duration::minutes(i as i64),
            ))
            .unwrap();
        }
        base
    }

    #[test]
    fn test_recent_is_most_recent_first() {
        let repo = InMemoryPriceRepository::new();
        seed(&repo, "AAPL", &[dec!(1), dec!(2), dec!(3)]);
        seed(&repo, "MSFT", &[dec!(50)]);

        let recent = repo.recent("AAPL", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].price, dec!(3));
        assert_eq!(recent[1].price, dec!(2));

        assert_eq!(repo.latest("AAPL").unwrap().unwrap().price, dec!(3));
        assert!(repo.latest("GOOGL").unwrap().is_none());
    }

    #[test]
    fn test_moving_average_windows() {
        let repo = InMemoryPriceRepository::new();
        assert_eq!(repo.moving_average("AAPL", 10).unwrap(), None);

        let prices: Vec<Decimal> = (100..110).map(Decimal::from).collect();
        seed(&repo, "AAPL", &prices);
        assert_eq!(repo.moving_average("AAPL", 10).unwrap(), Some(dec!(104.5)));

        // Fewer points than the window
        assert_eq!(repo.moving_average("AAPL", 20).unwrap(), Some(dec!(104.5)));

        // Only the most recent n count
        seed(&repo, "MSFT", &[dec!(1000), dec!(10), dec!(20)]);
        assert_eq!(repo.moving_average("MSFT", 2).unwrap(), Some(dec!(15)));
    }

    #[test]
    fn test_stats_and_count() {
        let repo = InMemoryPriceRepository::new();
        assert_eq!(repo.stats("AAPL").unwrap(), PriceStats::empty());

        seed(&repo, "AAPL", &[dec!(10), dec!(20), dec!(30)]);
        seed(&repo, "MSFT", &[dec!(5)]);

        let stats = repo.stats("AAPL").unwrap();
        assert_eq!(stats.avg, Some(dec!(20)));
        assert_eq!(stats.min, Some(dec!(10)));
        assert_eq!(stats.max, Some(dec!(30)));
        assert_eq!(stats.count, 3);

        assert_eq!(repo.count(Some("AAPL")).unwrap(), 3);
        assert_eq!(repo.count(None).unwrap(), 4);
    }

    #[test]
    fn test_range_and_purge() {
        let repo = InMemoryPriceRepository::new();
        let base = seed(&repo, "AAPL", &[dec!(1), dec!(2), dec!(3), dec!(4)]);
        seed(&repo, "MSFT", &[dec!(9)]);

        let range = repo
            .range_between("AAPL", base + Duration::minutes(1), base + Duration::minutes(2))
            .unwrap();
        assert_eq!(
            range.iter().map(|p| p.price).collect::<Vec<_>>(),
            vec![dec!(3), dec!(2)]
        );

        let deleted = repo
            .purge_older_than("AAPL", base + Duration::minutes(2))
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.count(Some("AAPL")).unwrap(), 2);
        assert_eq!(repo.count(Some("MSFT")).unwrap(), 1);
    }

    #[test]
    fn test_symbol_repository_crud() {
        let repo = InMemorySymbolRepository::new();
        assert!(!repo.exists("AAPL").unwrap());

        repo.insert(NewTrackedSymbol::new("AAPL")).unwrap();
        assert!(repo.insert(NewTrackedSymbol::new("AAPL")).is_err());
        repo.insert(NewTrackedSymbol::new("MSFT")).unwrap();

        repo.update("MSFT", TrackedSymbolUpdate::deactivate()).unwrap();
        assert!(repo.update("GOOGL", TrackedSymbolUpdate::deactivate()).unwrap().is_none());

        let active = repo.find_all(Some(true)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].symbol, "AAPL");
        assert_eq!(repo.find_all(None).unwrap().len(), 2);

        let now = Utc::now();
        repo.update_last_checked("AAPL", now).unwrap();
        assert_eq!(repo.find("AAPL").unwrap().unwrap().last_checked_at, Some(now));

        assert!(repo.delete("AAPL").unwrap());
        assert!(!repo.exists("AAPL").unwrap());
    }
}
