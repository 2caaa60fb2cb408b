use crate::error::DependencyError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How long to wait before each retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffSchedule {
    /// `initial * multiplier^n` before retry `n` (0-based).
    Exponential { initial: Duration, multiplier: u32 },
    /// Explicit delays; the last one repeats if retries outrun the list.
    Fixed(Vec<Duration>),
}

/// Bounded retry for transient dependency failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: BackoffSchedule,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

    /// Doubling backoff starting at `initial`.
    pub fn exponential(max_retries: u32, initial: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffSchedule::Exponential {
                initial,
                multiplier: 2,
            },
        }
    }

    /// One retry per listed delay.
    pub fn with_schedule(delays: Vec<Duration>) -> Self {
        Self {
            max_retries: delays.len() as u32,
            backoff: BackoffSchedule::Fixed(delays),
        }
    }

    pub fn no_retries() -> Self {
        Self::with_schedule(Vec::new())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// First attempt plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        match &self.backoff {
            BackoffSchedule::Exponential {
                initial,
                multiplier,
            } => {
                let factor = multiplier.saturating_pow(retry);
                initial.saturating_mul(factor)
            }
            BackoffSchedule::Fixed(delays) => delays
                .get(retry as usize)
                .or_else(|| delays.last())
                .copied()
                .unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_INITIAL_BACKOFF)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy is exhausted.
/// The closure receives the 0-based attempt number. Returns the last error on failure.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, DependencyError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DependencyError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries() {
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    "Dependency call failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    policy.max_attempts(),
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
