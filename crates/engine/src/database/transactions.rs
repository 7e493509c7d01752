//! Caller-side retry policy
//!
//! The engine never retries a batch by itself. `Database::commit_with_retry`
//! rebuilds and resubmits a batch on a fresh head revision when, and only
//! when, it lost a lock conflict.

use std::time::Duration;

use bimstore_core::ChangeError;

// ============================================================================
// Retry Configuration
// ============================================================================

/// Exponential back-off between attempts of a conflicting batch
///
/// # Example
/// ```ignore
/// let retry = RetryConfig::new().with_max_retries(5).with_max_delay_ms(200);
/// db.commit_with_retry(project, &retry, "move walls", |head| build(head))?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: usize,
    /// Base delay between retries in milliseconds (exponential backoff)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Whether attempt number `attempt` (0-based) may be followed by another
    /// after failing with `error`
    pub fn should_retry(&self, attempt: usize, error: &ChangeError) -> bool {
        error.is_retryable() && attempt < self.max_retries
    }

    /// Delay after failed attempt `attempt`: `base * 2^attempt`, capped
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        // Cap the shift to prevent overflow (1 << 63 is the max for u64)
        let shift = attempt.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}
