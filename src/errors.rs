//! Error types for price tracking operations
//!
//! Every service in the crate returns [`TrackerError`], which maps one-to-one onto
//! the HTTP outcomes of the REST layer. Errors raised by the Finnhub client are
//! carried as [`ExternalServiceError`] with a sub-kind so callers can tell an
//! unknown symbol apart from an exhausted retry budget.

use thiserror::Error;

use crate::database::connection::DatabaseError;

/// Sub-kind of an upstream price-feed failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalErrorKind {
    /// API key rejected or quota exhausted (HTTP 401/403)
    Auth,
    /// The feed does not know the symbol (HTTP 404)
    NotFound,
    /// The feed rate limited the request (HTTP 429)
    RateLimited,
    /// The payload did not have the expected shape
    InvalidResponse,
    /// The feed answered but reported a zero price
    NoData,
    /// Network failure or 5xx after the retry budget was spent
    Unavailable,
}

impl ExternalErrorKind {
    /// Whether this failure says something about the symbol itself,
    /// as opposed to the health of the feed.
    pub fn is_symbol_rejection(&self) -> bool {
        matches!(
            self,
            ExternalErrorKind::NotFound | ExternalErrorKind::NoData
        )
    }
}

/// Failure talking to the external price feed
#[derive(Debug, Clone, Error)]
#[error("Finnhub unavailable: {message}")]
pub struct ExternalServiceError {
    pub kind: ExternalErrorKind,
    pub message: String,
}

impl ExternalServiceError {
    pub fn new(kind: ExternalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors that can occur while tracking symbols or reading price data
///
/// # Error Categories
///
/// - **Client Errors**: `InvalidSymbol` (400), `NotFound` (404), `Conflict` (409)
/// - **Upstream Errors**: `ExternalService` (503)
/// - **Internal Errors**: `Database` (500)
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Symbol is not 1-5 uppercase letters
    #[error("Invalid symbol format: {0}. Symbol must be 1-5 uppercase letters")]
    InvalidSymbol(String),

    /// Symbol unknown, untracked, or without data yet
    #[error("{0}")]
    NotFound(String),

    /// Symbol is already being actively tracked
    #[error("{0}")]
    Conflict(String),

    /// The price feed failed or rejected the request
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    /// Persistence layer failure
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
