use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::cache::Cache;
use crate::errors::TrackerError;
use crate::finnhub::QuoteFetcher;
use crate::symbols::normalize;
use crate::stock::{
    DetailedAnalytics, StartTrackingResponse, StockService, StockSummary, SystemStats,
    TrackedSymbolView,
};

use super::responses::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub stock_service: StockService,
    pub cache: Cache,
    pub fetcher: Arc<dyn QuoteFetcher>,
}

/// Convert TrackerError to HTTP response
impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Conflict(_) => StatusCode::CONFLICT,
            TrackerError::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::Database(e) => {
                tracing::error!("Database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and collaborators are healthy", body = HealthResponse),
        (status = 503, description = "Cache or price feed unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (cache, finnhub) =
        tokio::join!(state.cache.health_check(), state.fetcher.health_check());
    let healthy = cache && finnhub;

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        cache,
        finnhub,
        active_jobs: state.stock_service.active_jobs(),
        timestamp: Utc::now(),
    };

    (status, Json(body))
}

/// Start tracking a symbol
#[utoipa::path(
    put,
    path = "/api/v1/stock/{symbol}",
    tag = "Stock",
    params(
        ("symbol" = String, Path, description = "Ticker, 1-5 letters (e.g., AAPL)")
    ),
    responses(
        (status = 200, description = "Tracking started or already running", body = StartTrackingResponse),
        (status = 400, description = "Invalid symbol format", body = ErrorResponse),
        (status = 404, description = "Symbol unknown to the price feed", body = ErrorResponse),
        (status = 409, description = "Symbol already tracked", body = ErrorResponse),
        (status = 503, description = "Price feed unavailable", body = ErrorResponse)
    )
)]
pub async fn start_tracking(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StartTrackingResponse>, TrackerError> {
    let symbol = normalize(&symbol)?;
    let response = state.stock_service.start_tracking(&symbol).await?;
    Ok(Json(response))
}

/// Get latest price, moving average and recent history
#[utoipa::path(
    get,
    path = "/api/v1/stock/{symbol}",
    tag = "Stock",
    params(
        ("symbol" = String, Path, description = "Ticker, 1-5 letters (e.g., AAPL)")
    ),
    responses(
        (status = 200, description = "Price summary", body = StockSummary),
        (status = 400, description = "Invalid symbol format", body = ErrorResponse),
        (status = 404, description = "Symbol not tracked or no data yet", body = ErrorResponse)
    )
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockSummary>, TrackerError> {
    let symbol = normalize(&symbol)?;
    let summary = state.stock_service.get_summary(&symbol).await?;
    Ok(Json(summary))
}

/// Get the summary with tracking details
#[utoipa::path(
    get,
    path = "/api/v1/stock/{symbol}/detailed",
    tag = "Stock",
    params(
        ("symbol" = String, Path, description = "Ticker, 1-5 letters (e.g., AAPL)")
    ),
    responses(
        (status = 200, description = "Detailed analytics", body = DetailedAnalytics),
        (status = 400, description = "Invalid symbol format", body = ErrorResponse),
        (status = 404, description = "Symbol not tracked or no data yet", body = ErrorResponse)
    )
)]
pub async fn get_stock_detailed(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<DetailedAnalytics>, TrackerError> {
    let symbol = normalize(&symbol)?;
    let detailed = state.stock_service.get_detailed(&symbol).await?;
    Ok(Json(detailed))
}

/// Stop tracking a symbol; stored prices are kept
#[utoipa::path(
    delete,
    path = "/api/v1/stock/{symbol}",
    tag = "Stock",
    params(
        ("symbol" = String, Path, description = "Ticker, 1-5 letters (e.g., AAPL)")
    ),
    responses(
        (status = 200, description = "Tracking stopped", body = MessageResponse),
        (status = 400, description = "Invalid symbol format", body = ErrorResponse),
        (status = 404, description = "No tracking job for symbol", body = ErrorResponse)
    )
)]
pub async fn stop_tracking(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<MessageResponse>, TrackerError> {
    let symbol = normalize(&symbol)?;
    let message = state.stock_service.stop_and_clear(&symbol).await?;
    Ok(Json(MessageResponse { message }))
}

/// List actively tracked symbols
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    tag = "Stock",
    responses(
        (status = 200, description = "Tracked symbols", body = Vec<TrackedSymbolView>)
    )
)]
pub async fn list_tracked(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrackedSymbolView>>, TrackerError> {
    let tracked = state.stock_service.tracked_symbols().await?;
    Ok(Json(tracked))
}

/// Scheduler and storage counters
#[utoipa::path(
    get,
    path = "/api/v1/stock/system/stats",
    tag = "System",
    responses(
        (status = 200, description = "System statistics", body = SystemStats)
    )
)]
pub async fn get_system_stats(
    State(state): State<AppState>,
) -> Result<Json<SystemStats>, TrackerError> {
    let stats = state.stock_service.system_stats().await?;
    Ok(Json(stats))
}
