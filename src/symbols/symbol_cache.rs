use std::time::Duration;

use crate::cache::Cache;

/// Existence cache: does the registry hold a record for the symbol
const SYMBOL_PREFIX: &str = "symbol:";
const SYMBOL_TTL: Duration = Duration::from_secs(300);

/// Validation cache: does the price feed know the symbol
const VALIDATION_PREFIX: &str = "symbol:valid:";
const VALIDATION_TTL: Duration = Duration::from_secs(3600);

/// Per-symbol boolean caches in front of the registry and the price feed
#[derive(Clone)]
pub struct SymbolCache {
    cache: Cache,
}

impl SymbolCache {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn symbol_key(symbol: &str) -> String {
        format!("{SYMBOL_PREFIX}{symbol}")
    }

    fn validation_key(symbol: &str) -> String {
        format!("{VALIDATION_PREFIX}{symbol}")
    }

    pub async fn cached_existence(&self, symbol: &str) -> Option<bool> {
        self.cache.get(&Self::symbol_key(symbol)).await
    }

    pub async fn set_existence(&self, symbol: &str, exists: bool) {
        self.cache
            .set(&Self::symbol_key(symbol), &exists, SYMBOL_TTL)
            .await;
    }

    pub async fn cached_validation(&self, symbol: &str) -> Option<bool> {
        self.cache.get(&Self::validation_key(symbol)).await
    }

    pub async fn set_validation(&self, symbol: &str, valid: bool) {
        self.cache
            .set(&Self::validation_key(symbol), &valid, VALIDATION_TTL)
            .await;
    }

    /// Drop both cached answers for symbol
    pub async fn invalidate(&self, symbol: &str) {
        self.cache.delete(&Self::symbol_key(symbol)).await;
        self.cache.delete(&Self::validation_key(symbol)).await;
    }
}
