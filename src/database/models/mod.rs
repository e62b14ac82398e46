pub mod price_point;
pub mod tracked_symbol;

pub use price_point::{NewPricePoint, PricePoint, PriceStats};
pub use tracked_symbol::{
    NewTrackedSymbol, TrackedSymbol, TrackedSymbolUpdate, DEFAULT_CHECK_INTERVAL_MS,
};
