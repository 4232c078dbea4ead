//! Retry utilities with configurable backoff and jitter strategies.
//!
//! Used by the health step when polling replaces the fixed settle pause.
//! Pipeline steps themselves are never retried.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the wait grows between probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// base * 2^failures, capped
    #[default]
    Exponential,
    /// Always base.
    Constant,
}

/// Randomisation applied on top of the backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Exact delays.
    None,
    /// Uniform in `0..=delay`.
    #[default]
    Full,
    /// Uniform in `delay/2..=delay`.
    Equal,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts, including the first one.
    pub max_attempts: usize,
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for waiting on a freshly rolled-out service.
    ///
    /// Twelve probes, 1s doubling to a 10s cap, equal jitter. Worst case is
    /// a little under two minutes.
    #[must_use]
    pub fn health_poll() -> Self {
        Self {
            max_attempts: 12,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::Equal,
        }
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }
}

/// Failed attempts of one retried operation.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Failed attempts so far.
    pub attempt: usize,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no attempts remain.
    #[must_use]
    pub fn is_exhausted(&self, config: &RetryConfig) -> bool {
        self.attempt >= config.max_attempts
    }

    /// Wait before the next attempt, given the failures so far.
    #[must_use]
    pub fn calculate_delay(&self, config: &RetryConfig) -> Duration {
        let capped = match config.backoff_strategy {
            BackoffStrategy::Exponential => {
                let exponent = u32::try_from(self.attempt).unwrap_or(u32::MAX);
                config
                    .base_delay_ms
                    .saturating_mul(2u64.saturating_pow(exponent))
            }
            BackoffStrategy::Constant => config.base_delay_ms,
        }
        .min(config.max_delay_ms);

        let millis = match config.jitter_strategy {
            JitterStrategy::None => capped,
            JitterStrategy::Full if capped > 0 => rand::thread_rng().gen_range(0..=capped),
            JitterStrategy::Equal if capped / 2 > 0 => {
                capped / 2 + rand::thread_rng().gen_range(0..=capped / 2)
            }
            JitterStrategy::Full | JitterStrategy::Equal => capped,
        };
        Duration::from_millis(millis)
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more attempts, give up.
    GiveUp,
}

/// Records a failed attempt and decides what to do next.
#[must_use]
pub fn should_retry(state: &mut RetryState, config: &RetryConfig) -> RetryDecision {
    state.attempt += 1;
    if state.is_exhausted(config) {
        return RetryDecision::GiveUp;
    }
    RetryDecision::Retry(state.calculate_delay(config))
}

/// Executes an operation until it succeeds or attempts run out.
///
/// Returns the last error when every attempt failed.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, key: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut state = RetryState::new();

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => match should_retry(&mut state, config) {
                RetryDecision::Retry(delay) => {
                    tracing::debug!(
                        key,
                        attempt = state.attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => return Err(e),
            },
        }
    }
}
