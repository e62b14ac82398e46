use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::finnhub::Quote;

/// Price point - one observed price for a symbol
///
/// Append-only; rows are only ever removed by retention
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::database::schema::stock_prices)]
#[diesel(primary_key(id))]
pub struct PricePoint {
    /// Auto-incrementing ID
    pub id: i64,

    pub symbol: String,

    /// Observed price
    #[schema(value_type = String)]
    pub price: Decimal,

    /// Traded volume, when the feed reports it
    pub volume: Option<i64>,

    /// Observation time reported by the feed
    pub timestamp: DateTime<Utc>,

    /// When this record was inserted into database
    pub created_at: DateTime<Utc>,
}

/// New price point for insertion
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = crate::database::schema::stock_prices)]
pub struct NewPricePoint {
    pub symbol: String,
    pub price: Decimal,
    pub volume: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl NewPricePoint {
    pub fn new(symbol: impl Into<String>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume: None,
            timestamp,
        }
    }

    pub fn with_volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl From<&Quote> for NewPricePoint {
    fn from(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            price: quote.price,
            volume: quote.volume,
            timestamp: quote.timestamp,
        }
    }
}

/// Aggregate over a symbol's stored prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceStats {
    #[schema(value_type = Option<String>)]
    pub avg: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub min: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub max: Option<Decimal>,
    pub count: i64,
}

impl PriceStats {
    pub fn empty() -> Self {
        Self {
            avg: None,
            min: None,
            max: None,
            count: 0,
        }
    }
}
