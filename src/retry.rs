//! Declarative retry configuration consumed by the HTTP layer.
//!
//! Failed attempts back off exponentially with uniform jitter; every attempt
//! is independently subject to the configured timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// Retry configuration applied to each logical request.
///
/// `max_attempts` counts every attempt including the first, so a value of `1`
/// disables retries entirely. Constructed once per client and shared by all
/// of its requests.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use musubi::retry::RetryPolicy;
///
/// let policy = RetryPolicy::default()
///     .with_max_attempts(3)
///     .with_wait_max(Duration::from_secs(2));
/// assert_eq!(policy.max_attempts, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Backoff delay after the first failed attempt.
    pub wait_initial: Duration,
    /// Upper bound for the exponential backoff delay.
    pub wait_max: Duration,
    /// Maximum extra delay drawn uniformly and added to each backoff wait.
    pub wait_jitter: Duration,
    /// Per-attempt timeout stamped onto every outgoing request.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            wait_initial: Duration::from_millis(100),
            wait_max: Duration::from_secs(5),
            wait_jitter: Duration::from_secs(1),
            timeout: Duration::from_secs(45),
        }
    }
}

impl RetryPolicy {
    /// Validates the policy, rejecting a zero attempt count.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when `max_attempts` is `0`.
    pub fn validated(self) -> Result<Self, LLMError> {
        if self.max_attempts == 0 {
            return Err(LLMError::InvalidConfig {
                field: "max_attempts".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        Ok(self)
    }

    /// 设置总尝试次数
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// 设置初始退避等待
    pub fn with_wait_initial(mut self, wait_initial: Duration) -> Self {
        self.wait_initial = wait_initial;
        self
    }

    /// 设置退避等待上限
    pub fn with_wait_max(mut self, wait_max: Duration) -> Self {
        self.wait_max = wait_max;
        self
    }

    /// 设置随机抖动上限
    pub fn with_wait_jitter(mut self, wait_jitter: Duration) -> Self {
        self.wait_jitter = wait_jitter;
        self
    }

    /// 设置单次请求超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Computes the backoff delay after the failed attempt with the given
    /// zero-based index: `min(wait_initial * 2^attempt, wait_max)` plus a
    /// uniform jitter in `[0, wait_jitter]`.
    pub(crate) fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.min(31) as i32;
        let base = self.wait_initial.as_secs_f64() * 2f64.powi(exponent);
        let capped = base.min(self.wait_max.as_secs_f64());
        let jitter = rand::random::<f64>() * self.wait_jitter.as_secs_f64();
        Duration::from_secs_f64(capped + jitter)
    }
}
