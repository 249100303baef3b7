use std::{future::Future, time::Duration};

use crate::{digest_config::RetryConfig, error::AppResult};

/// Run `op` until it succeeds, fails with a non-transient error or the retry
/// budget is spent. Backoff doubles each attempt: base, 2*base, 4*base...
pub async fn with_retry<T, F, Fut>(retry: &RetryConfig, what: &str, op: F) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                attempt += 1;
                let delay = backoff_delay(retry.base_delay_ms, attempt);
                tracing::info!(
                    "Retrying {} after {:?} (attempt {}/{}): {}",
                    what,
                    delay,
                    attempt,
                    retry.max_retries,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base_ms * 2^(attempt-1)`, saturating instead of overflowing
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1));
    Duration::from_millis(
        factor
            .and_then(|f| base_ms.checked_mul(f))
            .unwrap_or(u64::MAX),
    )
}

/// Truncate to at most `max_chars` characters without splitting a char
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast_retry(), "flaky", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::Transient("503".to_string()))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AppResult<()> = with_retry(&fast_retry(), "down", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::TooManyRequests)
        })
        .await;

        assert!(matches!(result, Err(AppError::TooManyRequests)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_or_not_found() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AppResult<()> = with_retry(&fast_retry(), "auth", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Auth("expired".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let result: AppResult<()> = with_retry(&fast_retry(), "gone", || async {
            Err(AppError::NotFound("abc".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(1000, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(1000, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(1000, 3), Duration::from_secs(4));
        // large retry budgets must not overflow
        assert_eq!(backoff_delay(1000, 64), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(1000, 200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("", 3), "");
        // multi-byte chars count as one
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }
}
