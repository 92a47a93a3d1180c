//! # Flood Control Module
//!
//! Telegram answers bursts of requests with `RetryAfter`. Outbound calls are
//! wrapped here so that only that error is retried, a bounded number of
//! times, after the wait Telegram asks for plus a little jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use teloxide::RequestError;
use tracing::warn;

use crate::config::RecoveryConfig;

/// Run `op`, retrying on `RetryAfter` according to `config`
///
/// Any other error, or a `RetryAfter` asking for longer than
/// `max_wait_secs`, is returned immediately.
pub async fn with_flood_retry<T, F, Fut>(
    config: &RecoveryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(RequestError::RetryAfter(wait))
                if attempt < config.max_retries
                    && u64::from(wait.seconds()) <= config.max_wait_secs =>
            {
                attempt += 1;
                let delay = Duration::from_secs(u64::from(wait.seconds())) + jitter(config.jitter_ms);
                warn!(
                    operation,
                    attempt,
                    wait_ms = delay.as_millis() as u64,
                    "Flood control hit, waiting before retry"
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
