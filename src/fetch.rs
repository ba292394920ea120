//! Retrying page fetcher shared by every tier.
//!
//! All fetches route through one client: capped total attempts, exponential
//! backoff, and retries only for server-class failure statuses. Everything
//! else fails fast as a typed error for the tier to record.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Statuses worth retrying; anything else is a terminal failure.
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Seam over HTTP so tier logic is testable against canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body, applying the bounded retry policy.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// The bounded-retry rules, separated from the transport so the per-attempt
/// decision can be exercised without a live server.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Is another attempt warranted after `status` on attempt number
    /// `attempt` (1-based)? Only server-class failures are retried, and
    /// never beyond the attempt cap.
    fn should_retry(&self, status: u16, attempt: u32) -> bool {
        RETRYABLE_STATUSES.contains(&status) && attempt < self.max_attempts
    }

    /// Delay before the attempt following `attempt`: the initial backoff,
    /// doubled for every retry already taken.
    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Drive single attempts under a policy. Terminal errors (timeouts,
/// connection failures, non-retryable statuses) pass straight through.
async fn run_with_retry<F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<String, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match attempt().await {
            Ok(body) => return Ok(body),
            Err(FetchError::Status { url, status }) if policy.should_retry(status, attempts) => {
                let delay = policy.backoff(attempts);
                warn!(
                    "{} returned {} (attempt {}/{}), backing off {:?}",
                    url, status, attempts, policy.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// The production fetcher: one `reqwest` client with a per-request timeout.
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.clone())
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            policy: RetryPolicy::new(
                config.max_attempts,
                Duration::from_secs(config.backoff_secs),
            ),
        }
    }

    async fn attempt_once(&self, url: &str) -> Result<String, FetchError> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
            Err(e) => {
                return Err(FetchError::Connection {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            response.text().await.map_err(|e| FetchError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            })
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl PageFetcher for RetryingClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        run_with_retry(&self.policy, || self.attempt_once(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_secs(1))
    }

    fn status_err(status: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.org/page".to_string(),
            status,
        }
    }

    #[test]
    fn test_should_retry_server_statuses_under_cap() {
        let policy = policy();
        for status in [500, 502, 503, 504] {
            for attempt in 1..5 {
                assert!(policy.should_retry(status, attempt));
            }
            // Fifth attempt is the last; no retry beyond it
            assert!(!policy.should_retry(status, 5));
        }
    }

    #[test]
    fn test_should_not_retry_client_errors() {
        let policy = policy();
        for status in [400, 403, 404, 410] {
            assert!(!policy.should_retry(status, 1));
        }
    }

    #[test]
    fn test_backoff_doubles_per_retry() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_503_exhausts_five_attempts() {
        let calls = Cell::new(0u32);
        let result = run_with_retry(&policy(), || {
            calls.set(calls.get() + 1);
            async { Err(status_err(503)) }
        })
        .await;

        assert_eq!(calls.get(), 5);
        assert!(matches!(
            result,
            Err(FetchError::Status { status: 503, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_404_fails_without_retry() {
        let calls = Cell::new(0u32);
        let result = run_with_retry(&policy(), || {
            calls.set(calls.get() + 1);
            async { Err(status_err(404)) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(
            result,
            Err(FetchError::Status { status: 404, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_after_transient_failures() {
        let calls = Cell::new(0u32);
        let result = run_with_retry(&policy(), || {
            calls.set(calls.get() + 1);
            let call = calls.get();
            async move {
                if call < 3 {
                    Err(status_err(502))
                } else {
                    Ok("page body".to_string())
                }
            }
        })
        .await;

        assert_eq!(calls.get(), 3);
        assert_eq!(result.unwrap(), "page body");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_follow_doubling_schedule() {
        // Paused clock: sleeps auto-advance, so attempt timestamps reflect
        // the exact backoff schedule 1s, 2s, 4s, 8s.
        let start = Instant::now();
        let offsets = std::cell::RefCell::new(Vec::new());
        let _ = run_with_retry(&policy(), || {
            offsets.borrow_mut().push(start.elapsed());
            async { Err(status_err(500)) }
        })
        .await;

        let offsets = offsets.into_inner();
        assert_eq!(
            offsets,
            vec![
                Duration::from_secs(0),
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(7),
                Duration::from_secs(15),
            ]
        );
    }
}
