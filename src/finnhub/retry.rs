use std::time::Duration;

/// Exponential backoff policy for quote requests
///
/// `max_attempts` counts every request including the first one. The delay
/// before attempt `n + 1` is `base_delay × 2^(n-1)`, so three attempts with a
/// one second base wait 1s and then 2s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after `attempt` (1-based) failed, or `None` if the budget is spent
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt - 1);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Every delay the policy will wait through before giving up
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .filter_map(|attempt| self.delay_after(attempt))
            .collect()
    }
}

/// Outcome classification of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Network error or 5xx, try again after backoff
    Retry,
    /// Terminal failure, surface immediately
    Fail,
}

impl RetryDecision {
    pub fn for_status(status: reqwest::StatusCode) -> Self {
        if status.is_server_error() {
            RetryDecision::Retry
        } else {
            RetryDecision::Fail
        }
    }
}
