use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::responses::*;
use crate::scheduler::JobStatus;
use crate::stock::models::{
    DetailedAnalytics, MemoryUsage, PriceHistoryEntry, StartTrackingResponse, StockSummary,
    SystemStats, TrackedSymbolView, TrackingInfo,
};

/// OpenAPI v1 specification
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Price Tracker API",
        version = "1.0.0",
        description = "Periodic stock price sampling with moving averages, backed by the Finnhub quote feed",
        license(
            name = "MIT"
        )
    ),
    paths(
        handlers::health_check,
        handlers::start_tracking,
        handlers::get_stock,
        handlers::get_stock_detailed,
        handlers::stop_tracking,
        handlers::list_tracked,
        handlers::get_system_stats,
    ),
    components(
        schemas(
            StartTrackingResponse,
            StockSummary,
            PriceHistoryEntry,
            DetailedAnalytics,
            TrackingInfo,
            TrackedSymbolView,
            JobStatus,
            SystemStats,
            MemoryUsage,
            MessageResponse,
            HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Stock", description = "Symbol tracking and price endpoints"),
        (name = "System", description = "Scheduler statistics"),
    )
)]
pub struct ApiDoc;
