/// Per-symbol tracking jobs
///
/// - `job`: job handle, status and overlap guard
/// - `tracking_scheduler`: job registry and the fetch-and-store cycle

pub mod job;
pub mod tracking_scheduler;

pub use job::{JobInfo, JobStatus};
pub use tracking_scheduler::{StartOutcome, TrackingScheduler};
