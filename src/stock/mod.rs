/// Stock query service
///
/// - `stock_service`: cache-aside summary, detailed view, listing and stats
/// - `models`: response shapes
/// - `system_stats`: uptime and process memory

pub mod models;
pub mod stock_service;
pub mod system_stats;

pub use models::{
    DetailedAnalytics, PriceHistoryEntry, StartTrackingResponse, StockSummary, SystemStats,
    TrackedSymbolView,
};
pub use stock_service::StockService;
