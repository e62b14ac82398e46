use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{ExternalErrorKind, ExternalServiceError};

/// Raw response from the /quote endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    /// Current price
    pub c: Option<f64>,
    /// Change
    pub d: Option<f64>,
    /// Percent change
    pub dp: Option<f64>,
    /// High price of the day
    pub h: Option<f64>,
    /// Low price of the day
    pub l: Option<f64>,
    /// Open price of the day
    pub o: Option<f64>,
    /// Previous close price
    pub pc: Option<f64>,
    /// Timestamp (Unix seconds)
    pub t: Option<i64>,
    /// Volume, only sent for some exchanges
    pub v: Option<f64>,
}

/// Error body returned by Finnhub on failures
#[derive(Debug, Deserialize)]
pub struct FinnhubErrorBody {
    pub error: Option<String>,
}

/// Canonical quote produced by the fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
}

impl QuoteResponse {
    /// Validate the payload and normalize it into a [`Quote`]
    pub fn into_quote(self, symbol: &str) -> Result<Quote, ExternalServiceError> {
        let current = self
            .c
            .ok_or_else(|| invalid(symbol, "missing current price"))?;

        // Finnhub answers unknown symbols with an all-zero payload
        if current == 0.0 {
            return Err(ExternalServiceError::new(
                ExternalErrorKind::NoData,
                format!("No data available for symbol {}", symbol),
            ));
        }

        let price = positive(current).ok_or_else(|| invalid(symbol, "current price must be positive"))?;

        let timestamp = self
            .t
            .filter(|t| *t > 0)
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .ok_or_else(|| invalid(symbol, "timestamp must be positive"))?;

        let high = optional_positive(self.h).map_err(|_| invalid(symbol, "high must be positive"))?;
        let low = optional_positive(self.l).map_err(|_| invalid(symbol, "low must be positive"))?;
        let open = optional_positive(self.o).map_err(|_| invalid(symbol, "open must be positive"))?;
        let previous_close =
            optional_positive(self.pc).map_err(|_| invalid(symbol, "previous close must be positive"))?;

        let volume = match self.v {
            Some(v) if v < 0.0 || !v.is_finite() => {
                return Err(invalid(symbol, "volume must be non-negative"))
            }
            Some(v) => Some(v.round() as i64),
            None => None,
        };

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            timestamp,
            // Finnhub sends 0 or null when there is no change figure
            change: self.d.filter(|d| *d != 0.0).and_then(to_decimal),
            percent_change: self.dp.filter(|dp| *dp != 0.0).and_then(to_decimal),
            high,
            low,
            open,
            previous_close,
            volume,
        })
    }
}

fn invalid(symbol: &str, reason: &str) -> ExternalServiceError {
    ExternalServiceError::new(
        ExternalErrorKind::InvalidResponse,
        format!("Invalid API response format for symbol {}: {}", symbol, reason),
    )
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok().map(|d| d.normalize())
}

fn positive(value: f64) -> Option<Decimal> {
    if value > 0.0 {
        to_decimal(value)
    } else {
        None
    }
}

fn optional_positive(value: Option<f64>) -> Result<Option<Decimal>, ()> {
    match value {
        None => Ok(None),
        Some(v) => positive(v).map(Some).ok_or(()),
    }
}
