/// Cron jobs and scheduled tasks module
///
/// Contains background jobs that run on a schedule:
/// - Price history retention
/// - Expired cache entry purge

pub mod cache_purge_job;
pub mod retention_job;

pub use cache_purge_job::CachePurgeJob;
pub use retention_job::RetentionJob;
