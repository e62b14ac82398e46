use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::database::models::{PricePoint, TrackedSymbol};
use crate::scheduler::JobStatus;

/// Response of a start-tracking request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTrackingResponse {
    pub job_id: String,
    pub message: String,
}

/// One entry of a price history, most recent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceHistoryEntry {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 189.84)]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl From<&PricePoint> for PriceHistoryEntry {
    fn from(point: &PricePoint) -> Self {
        Self {
            price: point.price,
            timestamp: point.timestamp,
        }
    }
}

/// Latest price, moving average and recent history for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 189.84)]
    pub current_price: Decimal,
    pub last_updated: DateTime<Utc>,
    /// Mean of the last 10 prices
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 188.1)]
    pub moving_average: Decimal,
    pub price_history: Vec<PriceHistoryEntry>,
}

/// Tracking state attached to the detailed view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub is_active: bool,
    /// Milliseconds between two checks
    pub check_interval: i64,
    pub last_checked: Option<DateTime<Utc>>,
    pub job_status: JobStatus,
    pub error_count: u32,
    pub last_error: Option<String>,
}

/// Summary plus intraday fields
///
/// `price_change`, `percent_change`, `high_24h`, `low_24h`, `volume_24h`,
/// `error_count` and `last_error` are not computed yet: change fields are 0,
/// high/low repeat the current price, volume is the latest point's volume.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalytics {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub current_price: Decimal,
    pub last_updated: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub moving_average: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price_change: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub percent_change: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub high_24h: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub low_24h: Decimal,
    pub volume_24h: i64,
    pub price_history: Vec<PriceHistoryEntry>,
    pub tracking: TrackingInfo,
}

/// Entry of the tracked symbol listing
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackedSymbolView {
    pub symbol: String,
    pub is_active: bool,
    pub check_interval: i64,
    pub last_checked: Option<DateTime<Utc>>,
    pub job_status: JobStatus,
}

impl TrackedSymbolView {
    pub fn new(record: &TrackedSymbol, job_status: JobStatus) -> Self {
        Self {
            symbol: record.symbol.clone(),
            is_active: record.is_active,
            check_interval: record.check_interval_ms,
            last_checked: record.last_checked_at,
            job_status,
        }
    }
}

/// Process memory figures, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss: u64,
    pub virtual_size: u64,
}

/// Process-wide tracking counters
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub active_jobs: usize,
    pub total_symbols: usize,
    pub total_prices: i64,
    /// Seconds since the service started
    pub uptime: f64,
    /// Absent where the platform does not expose it
    pub memory_usage: Option<MemoryUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_detailed_field_names() {
        let now = Utc::now();
        let detailed = DetailedAnalytics {
            symbol: "AAPL".to_string(),
            current_price: dec!(190),
            last_updated: now,
            moving_average: dec!(189),
            price_change: Decimal::ZERO,
            percent_change: Decimal::ZERO,
            high_24h: dec!(190),
            low_24h: dec!(190),
            volume_24h: 0,
            price_history: vec![],
            tracking: TrackingInfo {
                is_active: true,
                check_interval: 60_000,
                last_checked: None,
                job_status: JobStatus::Unknown,
                error_count: 0,
                last_error: None,
            },
        };

        let json = serde_json::to_value(&detailed).unwrap();
        assert_eq!(json["high24h"], 190.0);
        assert_eq!(json["priceChange"], 0.0);
        assert_eq!(json["volume24h"], 0);
        assert_eq!(json["tracking"]["jobStatus"], "UNKNOWN");
        assert!(json["tracking"]["lastError"].is_null());
    }

    #[test]
    fn test_summary_survives_cache_encoding() {
        let summary = StockSummary {
            symbol: "AAPL".to_string(),
            current_price: dec!(189.84),
            last_updated: Utc::now(),
            moving_average: dec!(188.1),
            price_history: vec![],
        };

        let raw = serde_json::to_string(&summary).unwrap();
        assert!(raw.contains("\"currentPrice\":189.84"));
        assert!(raw.contains("\"movingAverage\":188.1"));
        assert_eq!(serde_json::from_str::<StockSummary>(&raw).unwrap(), summary);
    }
}
