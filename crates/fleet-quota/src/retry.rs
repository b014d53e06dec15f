//! Outer retry wrapper for write operations (spec §4.G "Retry").

use std::time::Duration;

use fleet_entities::{FleetError, Result};
use rand::Rng;
use tracing::warn;

/// Retries `operation` up to `max_attempts` times with exponential backoff,
/// but only when the error is classified [`FleetError::is_transient`]
/// (spec §4.G "Retry": "serialization failure, deadlock, connection
/// reset").
pub async fn with_retry<F, Fut, T>(max_attempts: u32, base_delay: Duration, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = backoff_delay(base_delay, attempt);
                warn!(attempt, ?delay, error = %err, "transient failure, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
    let jitter_millis = rand::thread_rng().gen_range(0..=50);
    base_delay
        .saturating_mul(multiplier)
        .saturating_add(Duration::from_millis(jitter_millis))
}

/// Never retries — `Fatal` bypasses the outer wrapper entirely (used by
/// callers that must not retry, e.g. config load at startup).
pub fn is_retryable(err: &FleetError) -> bool {
    err.is_transient()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<&'static str> = with_retry(5, Duration::from_millis(1), move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    Err(FleetError::Transient {
                        message: "connection reset".to_string(),
                    })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<()> = with_retry(5, Duration::from_millis(1), move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(FleetError::invalid_argument("bad input"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<()> = with_retry(3, Duration::from_millis(1), move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(FleetError::Transient {
                    message: "deadlock".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
