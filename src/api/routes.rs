use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::*;
use super::openapi::ApiDoc;

/// Create the API router with Swagger UI
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Health endpoint (pings cache and price feed)
        .route("/api/v1/health", get(health_check))
        // Tracking endpoints
        .route("/api/v1/stock", get(list_tracked))
        .route("/api/v1/stock/system/stats", get(get_system_stats))
        .route(
            "/api/v1/stock/:symbol",
            get(get_stock).put(start_tracking).delete(stop_tracking),
        )
        .route("/api/v1/stock/:symbol/detailed", get(get_stock_detailed))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::responses::{ErrorResponse, HealthResponse, MessageResponse};
    use crate::cache::Cache;
    use crate::database::repositories::{InMemoryPriceRepository, InMemorySymbolRepository};
    use crate::errors::ExternalErrorKind;
    use crate::finnhub::test_support::MockQuoteFetcher;
    use crate::scheduler::TrackingScheduler;
    use crate::stock::StockService;
    use crate::symbols::{SymbolCache, SymbolService};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn make_state(fetcher: MockQuoteFetcher) -> AppState {
        let cache = Cache::in_memory();
        let fetcher = Arc::new(fetcher);
        let prices = Arc::new(InMemoryPriceRepository::new());
        let symbols = SymbolService::new(
            Arc::new(InMemorySymbolRepository::new()),
            fetcher.clone(),
            SymbolCache::new(cache.clone()),
            60_000,
        );
        let scheduler = Arc::new(TrackingScheduler::new(
            symbols.clone(),
            fetcher.clone(),
            prices.clone(),
        ));

        AppState {
            stock_service: StockService::new(
                scheduler,
                symbols,
                prices,
                cache.clone(),
                Duration::from_secs(30),
            ),
            cache,
            fetcher,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn parse<T: DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_start_then_get() {
        let app = create_router(make_state(
            MockQuoteFetcher::new().with_price("AAPL", dec!(189.84)),
        ));

        let (status, body) = send(&app, "PUT", "/api/v1/stock/aapl").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["jobId"].as_str().unwrap().starts_with("AAPL-"));
        assert_eq!(body["message"], "Started tracking AAPL");

        let (status, body) = send(&app, "GET", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["currentPrice"], 189.84);
        assert_eq!(body["movingAverage"], 189.84);
        assert_eq!(body["priceHistory"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = create_router(make_state(
            MockQuoteFetcher::new()
                .with_price("AAPL", dec!(189.84))
                .with_error("MSFT", ExternalErrorKind::Auth)
                .with_error("IBM", ExternalErrorKind::InvalidResponse),
        ));

        let (status, body) = send(&app, "GET", "/api/v1/stock/TOOLONG").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = parse(body);
        assert_eq!(error.error, "400 Bad Request");

        let (status, _) = send(&app, "PUT", "/api/v1/stock/123").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // "ß" must not uppercase into "SS"
        let (status, _) = send(&app, "PUT", "/api/v1/stock/%C3%9F").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "PUT", "/api/v1/stock/ZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "PUT", "/api/v1/stock/MSFT").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Malformed feed payloads are upstream failures, not unknown symbols
        let (status, _) = send(&app, "PUT", "/api/v1/stock/IBM").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(&app, "DELETE", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_restart_after_stop_conflicts() {
        let app = create_router(make_state(
            MockQuoteFetcher::new().with_price("AAPL", dec!(189.84)),
        ));

        send(&app, "PUT", "/api/v1/stock/AAPL").await;

        // A second start while the job runs is idempotent
        let (status, body) = send(&app, "PUT", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Already tracking AAPL");

        let (status, body) = send(&app, "DELETE", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        let message: MessageResponse = parse(body);
        assert_eq!(message.message, "Stopped tracking AAPL");

        // The symbol stays active in the registry
        let (status, _) = send(&app, "PUT", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "GET", "/api/v1/stock/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["priceHistory"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detailed_list_and_stats() {
        let app = create_router(make_state(
            MockQuoteFetcher::new().with_price("AAPL", dec!(150)),
        ));
        send(&app, "PUT", "/api/v1/stock/AAPL").await;

        let (status, body) = send(&app, "GET", "/api/v1/stock/AAPL/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["priceChange"], 0.0);
        assert_eq!(body["high24h"], 150.0);
        assert_eq!(body["tracking"]["jobStatus"], "ACTIVE");
        assert_eq!(body["tracking"]["checkInterval"], 60_000);
        assert_eq!(body["tracking"]["errorCount"], 0);

        let (status, body) = send(&app, "GET", "/api/v1/stock").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["symbol"], "AAPL");
        assert_eq!(body[0]["jobStatus"], "ACTIVE");

        let (status, body) = send(&app, "GET", "/api/v1/stock/system/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeJobs"], 1);
        assert_eq!(body["totalSymbols"], 1);
        assert_eq!(body["totalPrices"], 1);
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(make_state(
            MockQuoteFetcher::new().with_price("AAPL", dec!(150)),
        ));
        let (status, body) = send(&app, "GET", "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = parse(body);
        assert_eq!(health.status, "healthy");
        assert!(health.cache && health.finnhub);

        let app = create_router(make_state(MockQuoteFetcher::new()));
        let (status, body) = send(&app, "GET", "/api/v1/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }
}
