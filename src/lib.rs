// Library Crate Root
// lib.rs

pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod finnhub;
pub mod jobs;
pub mod scheduler;
pub mod stock;
pub mod symbols;

// pub use = re-export at crate root
pub use api::{create_router, AppState};
pub use cache::Cache;
pub use config::AppConfig;
pub use errors::{ExternalErrorKind, ExternalServiceError, TrackerError, TrackerResult};
pub use finnhub::{FinnhubClient, QuoteFetcher};
pub use scheduler::TrackingScheduler;
pub use stock::StockService;
pub use symbols::SymbolService;
