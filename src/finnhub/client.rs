use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, warn};

use super::models::{FinnhubErrorBody, Quote, QuoteResponse};
use super::retry::{RetryDecision, RetryPolicy};
use crate::config::FinnhubConfig;
use crate::errors::{ExternalErrorKind, ExternalServiceError};

/// Source of live quotes for a single symbol
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Fetch the current quote, retrying transient failures internally
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ExternalServiceError>;

    /// Probe the feed with a well known symbol
    async fn health_check(&self) -> bool {
        match self.fetch_quote("AAPL").await {
            Ok(_) => true,
            Err(e) => {
                error!("Finnhub health check failed: {}", e);
                false
            }
        }
    }
}

/// Finnhub REST client for the /quote endpoint
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

/// Result of one HTTP round trip before retry handling
enum Attempt {
    Done(Result<Quote, ExternalServiceError>),
    Transient(ExternalServiceError),
}

impl FinnhubClient {
    pub fn new(config: &FinnhubConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(config.retry_attempts, config.retry_delay()),
        })
    }

    async fn attempt(&self, symbol: &str) -> Attempt {
        let url = format!("{}/quote", self.base_url);

        let response = match self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(&[("symbol", symbol)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Transient(ExternalServiceError::new(
                    ExternalErrorKind::Unavailable,
                    format!("Request failed: {}", e),
                ))
            }
        };

        let status = response.status();
        debug!("Finnhub API response: /quote?symbol={} - {}", symbol, status);

        match status {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Attempt::Done(Err(ExternalServiceError::new(
                    ExternalErrorKind::Auth,
                    "API key is invalid or rate limit exceeded",
                )))
            }
            StatusCode::NOT_FOUND => {
                return Attempt::Done(Err(ExternalServiceError::new(
                    ExternalErrorKind::NotFound,
                    format!("Symbol {} not found", symbol),
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Attempt::Done(Err(ExternalServiceError::new(
                    ExternalErrorKind::RateLimited,
                    "Rate limit exceeded",
                )))
            }
            _ => {}
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<FinnhubErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {}", status));

            error!("Finnhub API error: /quote?symbol={} - {} - {}", symbol, status, message);

            let err = ExternalServiceError::new(ExternalErrorKind::Unavailable, message);
            return match RetryDecision::for_status(status) {
                RetryDecision::Retry => Attempt::Transient(err),
                RetryDecision::Fail => Attempt::Done(Err(err)),
            };
        }

        let body = match response.json::<QuoteResponse>().await {
            Ok(body) => body,
            Err(e) => {
                error!("Invalid Finnhub quote response for {}: {}", symbol, e);
                return Attempt::Done(Err(ExternalServiceError::new(
                    ExternalErrorKind::InvalidResponse,
                    format!("Invalid API response format for symbol {}", symbol),
                )));
            }
        };

        Attempt::Done(body.into_quote(symbol))
    }
}

#[async_trait]
impl QuoteFetcher for FinnhubClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ExternalServiceError> {
        let symbol = symbol.to_ascii_uppercase();
        let mut attempt = 1;

        loop {
            let last_error = match self.attempt(&symbol).await {
                Attempt::Done(result) => return result,
                Attempt::Transient(e) => e,
            };

            match self.retry.delay_after(attempt) {
                Some(delay) => {
                    warn!(
                        "Retrying Finnhub API request for {} (attempt {}) in {}ms: {}",
                        symbol,
                        attempt,
                        delay.as_millis(),
                        last_error.message
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(ExternalServiceError::new(
                        ExternalErrorKind::Unavailable,
                        format!(
                            "{} (gave up after {} attempts)",
                            last_error.message, attempt
                        ),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path, query_param};
    use std::time::Duration;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry_config(base_url: &str, attempts: u32) -> FinnhubConfig {
        let mut config = FinnhubConfig::new("test-token");
        config.base_url = base_url.to_string();
        config.retry_attempts = attempts;
        config.retry_delay_ms = 5;
        config.timeout_ms = 5_000;
        config
    }

    fn quote_body() -> serde_json::Value {
        serde_json::json!({
            "c": 189.5, "d": 1.2, "dp": 0.64, "h": 190.1,
            "l": 187.3, "o": 188.0, "pc": 188.3, "t": 1704067200
        })
    }

    #[tokio::test]
    async fn test_fetch_quote_sends_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .and(header("X-Finnhub-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = FinnhubClient::new(&fast_retry_config(&server.uri(), 3)).unwrap();
        let quote = client.fetch_quote("aapl").await.unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(189.5));
    }

    #[tokio::test]
    async fn test_server_errors_retried_until_budget_spent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = FinnhubClient::new(&fast_retry_config(&server.uri(), 3)).unwrap();
        let err = client.fetch_quote("AAPL").await.unwrap_err();

        assert_eq!(err.kind, ExternalErrorKind::Unavailable);
        assert!(err.message.contains("gave up after 3 attempts"));
    }

    #[tokio::test]
    async fn test_transient_error_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_body()))
            .mount(&server)
            .await;

        let client = FinnhubClient::new(&fast_retry_config(&server.uri(), 3)).unwrap();
        let quote = client.fetch_quote("AAPL").await.unwrap();
        assert_eq!(quote.price, dec!(189.5));
    }

    #[tokio::test]
    async fn test_non_retryable_statuses_fail_immediately() {
        for (status, kind) in [
            (403, ExternalErrorKind::Auth),
            (404, ExternalErrorKind::NotFound),
            (429, ExternalErrorKind::RateLimited),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/quote"))
                .respond_with(ResponseTemplate::new(status))
                .expect(1)
                .mount(&server)
                .await;

            let client = FinnhubClient::new(&fast_retry_config(&server.uri(), 3)).unwrap();
            let err = client.fetch_quote("AAPL").await.unwrap_err();
            assert_eq!(err.kind, kind, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_zero_price_rejected_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FinnhubClient::new(&fast_retry_config(&server.uri(), 3)).unwrap();
        let err = client.fetch_quote("NOPE").await.unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::NoData);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = FinnhubClient::new(&fast_retry_config(&server.uri(), 3)).unwrap();
        let err = client.fetch_quote("AAPL").await.unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_retry_waits_one_then_two_seconds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let mut config = fast_retry_config(&server.uri(), 3);
        config.retry_delay_ms = 1000;
        let client = FinnhubClient::new(&config).unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch_quote("AAPL").await.unwrap_err();

        assert_eq!(err.kind, ExternalErrorKind::Unavailable);
        // 1000ms after the first failure, 2000ms after the second, none after the last
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "waited {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(7000), "waited {:?}", elapsed);
    }
}
