use crate::database::connection::{DatabaseError, PgPooledConnection};
use crate::database::models::{NewPricePoint, PricePoint, PriceStats};
use crate::database::schema::stock_prices;
use chrono::{DateTime, Utc};
use diesel::dsl::{avg, count, sql};
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Numeric};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Default window of the moving average and of the price history
pub const DEFAULT_WINDOW: i64 = 10;

/// Price repository trait - append-only time series of price points
///
/// Every ordered read returns the most recent point first
#[async_trait::async_trait]
pub trait PriceRepository: Send + Sync {
    /// Append a price point
    fn append(&self, point: NewPricePoint) -> Result<PricePoint, DatabaseError>;

    /// Most recent price point for symbol
    fn latest(&self, symbol: &str) -> Result<Option<PricePoint>, DatabaseError>;

    /// Up to `limit` most recent price points for symbol
    fn recent(&self, symbol: &str, limit: i64) -> Result<Vec<PricePoint>, DatabaseError>;

    /// Price points with `start <= timestamp <= end`
    fn range_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DatabaseError>;

    /// Average, min, max and count over all stored prices for symbol
    fn stats(&self, symbol: &str) -> Result<PriceStats, DatabaseError>;

    /// Number of stored points for symbol, or across all symbols
    fn count(&self, symbol: Option<&str>) -> Result<i64, DatabaseError>;

    /// Delete points with `timestamp < cutoff`; returns the number deleted
    fn purge_older_than(&self, symbol: &str, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError>;

    /// Arithmetic mean of the `n` most recent prices, `None` without data
    fn moving_average(&self, symbol: &str, n: i64) -> Result<Option<Decimal>, DatabaseError> {
        let points = self.recent(symbol, n)?;
        Ok(mean(&points))
    }
}

/// Mean price of the given points
pub fn mean(points: &[PricePoint]) -> Option<Decimal> {
    if points.is_empty() {
        return None;
    }

    let sum: Decimal = points.iter().map(|p| p.price).sum();
    Some((sum / Decimal::from(points.len())).normalize())
}

/// PostgreSQL implementation of PriceRepository
pub struct PriceRepositoryImpl {
    get_conn: Arc<dyn Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync>,
}

impl PriceRepositoryImpl {
    /// Create new price repository with connection provider
    pub fn new<F>(get_conn: F) -> Self
    where
        F: Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync + 'static,
    {
        Self {
            get_conn: Arc::new(get_conn),
        }
    }
}

#[async_trait::async_trait]
impl PriceRepository for PriceRepositoryImpl {
    fn append(&self, point: NewPricePoint) -> Result<PricePoint, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        diesel::insert_into(stock_prices::table)
            .values(&point)
            .get_result::<PricePoint>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn latest(&self, symbol: &str) -> Result<Option<PricePoint>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        stock_prices::table
            .filter(stock_prices::symbol.eq(symbol))
            .order(stock_prices::timestamp.desc())
            .first::<PricePoint>(&mut conn)
            .optional()
            .map_err(DatabaseError::from)
    }

    fn recent(&self, symbol: &str, limit: i64) -> Result<Vec<PricePoint>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        stock_prices::table
            .filter(stock_prices::symbol.eq(symbol))
            .order(stock_prices::timestamp.desc())
            .limit(limit.max(0))
            .load::<PricePoint>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn range_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        stock_prices::table
            .filter(stock_prices::symbol.eq(symbol))
            .filter(stock_prices::timestamp.ge(start))
            .filter(stock_prices::timestamp.le(end))
            .order(stock_prices::timestamp.desc())
            .load::<PricePoint>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn stats(&self, symbol: &str) -> Result<PriceStats, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let (avg, min, max, count) = stock_prices::table
            .filter(stock_prices::symbol.eq(symbol))
            .select((
                avg(stock_prices::price),
                // diesel has no ordered aggregate for NUMERIC
                sql::<Nullable<Numeric>>("MIN(price)"),
                sql::<Nullable<Numeric>>("MAX(price)"),
                count(stock_prices::id),
            ))
            .first::<(Option<Decimal>, Option<Decimal>, Option<Decimal>, i64)>(&mut conn)?;

        Ok(PriceStats {
            avg,
            min,
            max,
            count,
        })
    }

    fn count(&self, symbol: Option<&str>) -> Result<i64, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let mut query = stock_prices::table.into_boxed();
        if let Some(symbol) = symbol {
            query = query.filter(stock_prices::symbol.eq(symbol));
        }

        query
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn purge_older_than(&self, symbol: &str, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let deleted = diesel::delete(
            stock_prices::table
                .filter(stock_prices::symbol.eq(symbol))
                .filter(stock_prices::timestamp.lt(cutoff)),
        )
        .execute(&mut conn)?;

        Ok(deleted)
    }
}
