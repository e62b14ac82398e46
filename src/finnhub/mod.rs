/// Finnhub price feed integration
///
/// - `client`: HTTP client for /quote with retry and failure classification
/// - `models`: wire format and the canonical `Quote`
/// - `retry`: exponential backoff policy

pub mod client;
pub mod models;
pub mod retry;

pub use client::{FinnhubClient, QuoteFetcher};
pub use models::{Quote, QuoteResponse};
pub use retry::RetryPolicy;
