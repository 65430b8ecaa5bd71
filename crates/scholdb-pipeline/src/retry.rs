//! Per-attempt timeout and exponential back-off with jitter for source fetches.
//!
//! Only errors [`FetchError::is_retriable`] accepts are retried. Not-found,
//! client errors, and markup failures are returned after the first attempt.

use std::future::Future;
use std::time::Duration;

use scholdb_core::RawListing;
use scholdb_scraper::{FetchError, FetchErrorKind, SourceAdapter};

const MAX_DELAY_MS: u64 = 300_000;

/// Fetches one adapter's listings, bounding each attempt by `timeout` and
/// retrying transient failures up to `max_retries` times.
pub(crate) async fn fetch_with_retry(
    adapter: &dyn SourceAdapter,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
) -> Result<Vec<RawListing>, FetchError> {
    retry_with_backoff(max_retries, backoff_base, move || async move {
        match tokio::time::timeout(timeout, adapter.fetch_listings()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                adapter.id(),
                FetchErrorKind::Timeout {
                    timeout_secs: timeout.as_secs(),
                },
            )),
        }
    })
    .await
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// retriable errors.
///
/// Back-off before retry `n` is `backoff_base × 2ⁿ⁻¹` with ±25 % jitter,
/// capped at five minutes.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base: Duration,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let base_ms = u64::try_from(backoff_base.as_millis()).unwrap_or(u64::MAX);
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = jittered_delay_ms(base_ms, attempt);
                tracing::warn!(
                    source = %err.source_id,
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err.kind,
                    "transient fetch error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

fn jittered_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let computed = base_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(20));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    jittered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> FetchError {
        FetchError::new(
            "flaky",
            FetchErrorKind::UnexpectedStatus {
                status: 503,
                url: "https://flaky.example.org/".to_owned(),
            },
        )
    }

    #[test]
    fn delay_grows_exponentially_within_jitter_bounds() {
        for attempt in 1..=4u32 {
            let expected = 1_000u64 << (attempt - 1);
            let delay = jittered_delay_ms(1_000, attempt);
            assert!(delay >= expected * 3 / 4, "attempt {attempt}: {delay}");
            assert!(delay <= expected * 5 / 4, "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn delay_is_capped() {
        assert!(jittered_delay_ms(u64::MAX, 30) <= MAX_DELAY_MS * 5 / 4);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&calls);
        let result = retry_with_backoff(2, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok::<u32, FetchError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&calls);
        let result = retry_with_backoff(2, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(server_error())
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&calls);
        let result = retry_with_backoff(3, Duration::ZERO, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, FetchError>(FetchError::new(
                    "gone",
                    FetchErrorKind::NotFound {
                        url: "https://gone.example.org/".to_owned(),
                    },
                ))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(FetchError {
                kind: FetchErrorKind::NotFound { .. },
                ..
            })
        ));
    }
}
