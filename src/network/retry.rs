//! Upstream request retries with exponential backoff

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use crate::errors::{SimError, SimResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no sleeping.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Pause after failed attempt `attempt` (1-based). `jitter` in `[0, 1)` moves the
    /// capped delay by up to ±5%.
    pub fn backoff(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let capped = (self.initial_delay_ms as f64 * self.exponential_base.powi(exponent))
            .min(self.max_delay_ms as f64);
        let jittered = capped * (1.0 + 0.1 * (jitter - 0.5));
        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

/// Runs one upstream `request` against `source`, retrying transient failures. Exhausting
/// the attempts yields `SimError::UpstreamFetch` carrying the last error.
pub async fn fetch_with_retry<F, Fut, T>(
    source: &str,
    request: &str,
    config: &RetryConfig,
    operation: F,
) -> SimResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(source, attempt, "Upstream {} recovered", request);
                }
                return Ok(value);
            }
            Err(e) => {
                if attempt < attempts {
                    let delay = config.backoff(attempt, rand::random::<f64>());
                    warn!(
                        source,
                        attempt,
                        max_attempts = attempts,
                        "⚠️ Upstream {} failed: {:#}. Retrying in {:?}",
                        request,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(SimError::UpstreamFetch {
        message: format!("{} {} failed after {} attempts", source, request, attempts),
        source: last_error,
        retry_count: attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 300,
            exponential_base: 2.0,
        };
        assert_eq!(config.backoff(1, 0.5), Duration::from_millis(100));
        assert_eq!(config.backoff(2, 0.5), Duration::from_millis(200));
        assert_eq!(config.backoff(3, 0.5), Duration::from_millis(300));
        assert_eq!(config.backoff(3, 0.0), Duration::from_millis(285));
        assert_eq!(config.backoff(40, 0.5), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            exponential_base: 2.0,
        };
        let result = fetch_with_retry("coingecko", "simple price", &config, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                anyhow::bail!("flaky");
            }
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reports_source_and_attempts_when_exhausted() {
        let result: SimResult<()> = fetch_with_retry(
            "jupiter",
            "quote SOL → USDC",
            &RetryConfig::no_retry(),
            || async { Err::<(), _>(anyhow::anyhow!("down")) },
        )
        .await;
        match result {
            Err(SimError::UpstreamFetch { retry_count, message, source }) => {
                assert_eq!(retry_count, 1);
                assert_eq!(message, "jupiter quote SOL → USDC failed after 1 attempts");
                assert_eq!(source.map(|e| e.to_string()).as_deref(), Some("down"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
