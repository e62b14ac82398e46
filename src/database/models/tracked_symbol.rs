use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default period between two price checks for a symbol
pub const DEFAULT_CHECK_INTERVAL_MS: i64 = 60_000;

/// Tracked symbol - a ticker under (or previously under) price tracking
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::database::schema::tracked_symbols)]
#[diesel(primary_key(symbol))]
#[serde(rename_all = "camelCase")]
pub struct TrackedSymbol {
    /// Ticker (e.g., "AAPL"), 1-5 uppercase letters
    pub symbol: String,

    /// Whether the symbol is currently tracked
    pub is_active: bool,

    /// Period between two price checks, in milliseconds
    pub check_interval_ms: i64,

    /// Time of the last successful price check
    pub last_checked_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Job was stopped; the symbol is not resumed on boot
    pub is_paused: bool,
}

/// New tracked symbol for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::database::schema::tracked_symbols)]
pub struct NewTrackedSymbol {
    pub symbol: String,
    pub is_active: bool,
    pub check_interval_ms: i64,
}

impl NewTrackedSymbol {
    /// Active symbol with the default check interval
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            is_active: true,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
        }
    }

    pub fn with_interval(mut self, check_interval_ms: i64) -> Self {
        self.check_interval_ms = check_interval_ms;
        self
    }
}

/// Partial update of a tracked symbol; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, AsChangeset, Deserialize, ToSchema)]
#[diesel(table_name = crate::database::schema::tracked_symbols)]
#[serde(rename_all = "camelCase")]
pub struct TrackedSymbolUpdate {
    pub is_active: Option<bool>,
    pub check_interval_ms: Option<i64>,
    pub is_paused: Option<bool>,
}

impl TrackedSymbolUpdate {
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    /// Reactivate and clear any stopped job flag
    pub fn activate() -> Self {
        Self {
            is_active: Some(true),
            is_paused: Some(false),
            ..Self::default()
        }
    }

    pub fn pause() -> Self {
        Self {
            is_paused: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.check_interval_ms.is_none() && self.is_paused.is_none()
    }

    /// Apply to an in-memory record
    pub fn apply_to(&self, record: &mut TrackedSymbol) {
        if let Some(is_active) = self.is_active {
            record.is_active = is_active;
        }
        if let Some(interval) = self.check_interval_ms {
            record.check_interval_ms = interval;
        }
        if let Some(is_paused) = self.is_paused {
            record.is_paused = is_paused;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracked_symbol_defaults() {
        let new = NewTrackedSymbol::new("AAPL");
        assert_eq!(new.symbol, "AAPL");
        assert!(new.is_active);
        assert_eq!(new.check_interval_ms, 60_000);

        let custom = NewTrackedSymbol::new("MSFT").with_interval(5_000);
        assert_eq!(custom.check_interval_ms, 5_000);
    }

    #[test]
    fn test_update_apply() {
        let now = Utc::now();
        let mut record = TrackedSymbol {
            symbol: "AAPL".to_string(),
            is_active: true,
            check_interval_ms: 60_000,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
            is_paused: false,
        };

        TrackedSymbolUpdate::deactivate().apply_to(&mut record);
        assert!(!record.is_active);
        assert_eq!(record.check_interval_ms, 60_000);

        let update = TrackedSymbolUpdate {
            check_interval_ms: Some(30_000),
            ..TrackedSymbolUpdate::default()
        };
        update.apply_to(&mut record);
        assert!(!record.is_active);
        assert_eq!(record.check_interval_ms, 30_000);
        assert!(TrackedSymbolUpdate::default().is_empty());

        TrackedSymbolUpdate::pause().apply_to(&mut record);
        assert!(record.is_paused);
        TrackedSymbolUpdate::activate().apply_to(&mut record);
        assert!(record.is_active && !record.is_paused);
    }
}
