use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Scheduler view of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// A recurring job is registered for the symbol
    Active,
    /// No job is registered
    Unknown,
}

/// Snapshot of a registered job
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub job_id: String,
    pub symbol: String,
    pub interval_ms: u64,
    pub started_at: DateTime<Utc>,
    pub status: JobStatus,
}

/// Guard flag keeping fetch cycles for one symbol from overlapping
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Claim the slot; `None` while another cycle holds it
    pub fn try_enter(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self.0.clone()))
    }
}

/// Releases the in-flight slot on drop
pub struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Live recurring job for one symbol
pub struct Job {
    pub job_id: String,
    pub symbol: String,
    pub interval: Duration,
    pub started_at: DateTime<Utc>,
    pub(crate) in_flight: InFlight,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Job {
    pub(crate) fn new(
        symbol: &str,
        interval: Duration,
        in_flight: InFlight,
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            job_id: format!("{}-{}", symbol, uuid::Uuid::new_v4().simple()),
            symbol: symbol.to_string(),
            interval,
            started_at: Utc::now(),
            in_flight,
            cancel,
            handle,
        }
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            job_id: self.job_id.clone(),
            symbol: self.symbol.clone(),
            interval_ms: self.interval.as_millis() as u64,
            started_at: self.started_at,
            status: JobStatus::Active,
        }
    }

    /// Stop future ticks; a cycle already running is left to finish
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the task to exit
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("Job {} ended abnormally: {}", self.job_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard() {
        let in_flight = InFlight::default();

        let guard = in_flight.try_enter();
        assert!(guard.is_some());
        assert!(in_flight.try_enter().is_none());

        drop(guard);
        assert!(in_flight.try_enter().is_some());
    }

    #[test]
    fn test_job_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Active).unwrap(), "\"ACTIVE\"");
        assert_eq!(serde_json::to_string(&JobStatus::Unknown).unwrap(), "\"UNKNOWN\"");
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"ACTIVE\"").unwrap(),
            JobStatus::Active
        );
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_task() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { token.cancelled().await });

        let job = Job::new(
            "AAPL",
            Duration::from_secs(60),
            InFlight::default(),
            cancel,
            handle,
        );
        assert!(job.job_id.starts_with("AAPL-"));

        job.shutdown().await;
    }
}
