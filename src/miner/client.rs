//! Retrying HTTP client for identifier pages
//!
//! This module handles page requests for the miner, including:
//! - Building the HTTP client with the configured user agent
//! - Bounded retry with exponential backoff on transient failures
//! - Converting every failure into a [`FetchResult`] variant instead of an error

use crate::config::HttpConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Status codes that trigger a retry
pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Upper bound on a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Result of a page fetch
#[derive(Debug)]
pub enum FetchResult {
    /// Page was fetched with a 2xx status
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-2xx status (retries exhausted or not retryable)
    HttpError {
        /// The last HTTP status code received
        status_code: u16,
        /// Requests sent, first attempt included
        attempts: u32,
    },

    /// Request failed below HTTP (connection refused, timeout, body read error)
    NetworkError {
        /// Error description
        error: String,
        /// Requests sent, first attempt included
        attempts: u32,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Number of requests sent for a failure, 1 for a success
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { .. } => 1,
            Self::HttpError { attempts, .. } | Self::NetworkError { attempts, .. } => *attempts,
        }
    }
}

/// Retry bound and backoff schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries_total: u32,

    /// Delay before the first retry; doubles for each following retry
    pub backoff_factor: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            retries_total: config.retries_total,
            backoff_factor: Duration::from_millis(config.backoff_factor_ms),
        }
    }

    /// Delay before retry number `retry` (1-indexed)
    ///
    /// `backoff_factor * 2^(retry - 1)`, capped at two minutes.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_factor
            .checked_mul(1u32 << exponent)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Returns true if `status` is one of [`RETRY_STATUSES`]
    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }

    fn is_retryable_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}

/// Builds the page client with the configured user agent
///
/// Redirects follow reqwest's default policy (up to 10 hops).
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page client with a fixed retry policy
///
/// Immutable after construction; share it across workers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            policy: RetryPolicy::from_config(config),
        })
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | HTTP 500, 502, 503, 504 | Retry up to `retries_total` times |
    /// | Timeout / connection error | Retry up to `retries_total` times |
    /// | Any other status | Immediate HttpError |
    /// | Body read error | Immediate NetworkError |
    ///
    /// Never returns an error; failures are logged and reported as variants.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut retries = 0u32;

        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let final_url = response.url().to_string();
                        return match response.text().await {
                            Ok(body) => FetchResult::Success {
                                final_url,
                                status_code: status.as_u16(),
                                body,
                            },
                            Err(e) => {
                                tracing::warn!("Failed to read body of {}: {}", url, e);
                                FetchResult::NetworkError {
                                    error: e.to_string(),
                                    attempts: retries + 1,
                                }
                            }
                        };
                    }

                    if RetryPolicy::is_retryable_status(status)
                        && retries < self.policy.retries_total
                    {
                        retries += 1;
                        self.backoff(url, retries, &format!("HTTP {}", status.as_u16()))
                            .await;
                        continue;
                    }

                    tracing::warn!(
                        "Request to {} failed with HTTP {} after {} attempt(s)",
                        url,
                        status.as_u16(),
                        retries + 1
                    );
                    return FetchResult::HttpError {
                        status_code: status.as_u16(),
                        attempts: retries + 1,
                    };
                }
                Err(e) => {
                    if RetryPolicy::is_retryable_error(&e) && retries < self.policy.retries_total {
                        retries += 1;
                        self.backoff(url, retries, &e.to_string()).await;
                        continue;
                    }

                    tracing::warn!(
                        "Connection error for {} after {} attempt(s): {}",
                        url,
                        retries + 1,
                        e
                    );
                    return FetchResult::NetworkError {
                        error: describe_error(&e),
                        attempts: retries + 1,
                    };
                }
            }
        }
    }

    async fn backoff(&self, url: &str, retry: u32, cause: &str) {
        let delay = self.policy.delay_for(retry);
        tracing::debug!(
            "Retry {}/{} for {} in {:?} ({})",
            retry,
            self.policy.retries_total,
            url,
            delay,
            cause
        );
        tokio::time::sleep(delay).await;
    }
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(retries_total: u32) -> HttpConfig {
        HttpConfig {
            user_agent: "TestAgent/1.0".to_string(),
            retries_total,
            backoff_factor_ms: 0,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&test_config(3)).is_ok());
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy {
            retries_total: 5,
            backoff_factor: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(40), MAX_BACKOFF);
    }

    #[test]
    fn test_retryable_statuses() {
        for code in [500, 502, 503, 504] {
            assert!(RetryPolicy::is_retryable_status(
                StatusCode::from_u16(code).unwrap()
            ));
        }
        for code in [400, 403, 404, 429, 501] {
            assert!(!RetryPolicy::is_retryable_status(
                StatusCode::from_u16(code).unwrap()
            ));
        }
    }

    #[tokio::test]
    async fn test_success_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aabcde"))
            .and(wiremock::matchers::header("user-agent", "TestAgent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RetryingClient::new(&test_config(3)).unwrap();
        let result = client.fetch(&format!("{}/aabcde", server.uri())).await;

        match result {
            FetchResult::Success {
                status_code, body, ..
            } => {
                assert_eq!(status_code, 200);
                assert_eq!(body, "<html></html>");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_bound_on_retryable_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let client = RetryingClient::new(&test_config(3)).unwrap();
        let result = client.fetch(&format!("{}/aabcde", server.uri())).await;

        assert!(matches!(
            result,
            FetchResult::HttpError {
                status_code: 503,
                attempts: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_no_retry_on_non_retryable_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = RetryingClient::new(&test_config(3)).unwrap();
        let result = client.fetch(&format!("{}/aabcde", server.uri())).await;

        assert!(matches!(
            result,
            FetchResult::HttpError {
                status_code: 404,
                attempts: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RetryingClient::new(&test_config(3)).unwrap();
        let result = client.fetch(&format!("{}/aabcde", server.uri())).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_zero_retries_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = RetryingClient::new(&test_config(0)).unwrap();
        let result = client.fetch(&format!("{}/x", server.uri())).await;
        assert_eq!(result.attempts(), 1);
    }

    #[tokio::test]
    async fn test_connection_error_is_soft_failure() {
        // Bind then drop a listener so the port is closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RetryingClient::new(&test_config(1)).unwrap();
        let result = client.fetch(&format!("http://{}/aabcde", addr)).await;

        assert!(matches!(
            result,
            FetchResult::NetworkError { attempts: 2, .. }
        ));
    }
}
