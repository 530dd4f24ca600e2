//! Rate limiting and retry for the Catalog Client (§4.2). A governor token
//! bucket enforces the per-upstream ceiling; transient failures retry with
//! exponential backoff, and cancellation at any suspension point (limiter
//! wait, network wait, backoff sleep) propagates immediately.

use crate::error::{CoreError, CoreResult};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 4,
            burst_size: 10,
        }
    }
}

/// A rate-limited HTTP client wrapper, one per upstream (TMDB, TVDB).
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    #[must_use]
    pub fn new(name: &str, config: RateLimitConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build http client"),
            limiter: Arc::new(RateLimiter::direct(quota)),
            name: name.to_string(),
        }
    }

    /// ~4 requests/second, below TMDB's documented 40/10s ceiling (§4.2).
    #[must_use]
    pub fn for_tmdb() -> Self {
        Self::new(
            "tmdb",
            RateLimitConfig {
                requests_per_second: 4,
                burst_size: 10,
            },
        )
    }

    #[must_use]
    pub fn for_tvdb() -> Self {
        Self::new(
            "tvdb",
            RateLimitConfig {
                requests_per_second: 4,
                burst_size: 10,
            },
        )
    }

    /// Waits for a rate-limit permit (cancellable), then issues the GET.
    pub async fn get_with_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
        headers: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> CoreResult<Response> {
        tokio::select! {
            () = cancel.cancelled() => return Err(CoreError::Cancelled),
            () = self.limiter.until_ready() => {}
        }

        let mut request = self.client.get(url).query(query);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        tokio::select! {
            () = cancel.cancelled() => Err(CoreError::Cancelled),
            result = request.send() => result.map_err(|e| CoreError::ExternalTransient(format!("{}: {e}", self.name))),
        }
    }

    /// Rate-limited, cancellable POST with a JSON body (used for TVDB login).
    pub async fn login_post(&self, url: &str, body: &serde_json::Value) -> CoreResult<String> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CoreError::ExternalTransient(format!("{}: {e}", self.name)))?;

        if response.status().as_u16() == 429 {
            return Err(CoreError::ExternalRateLimited(self.name.clone()));
        }
        if !response.status().is_success() {
            return Err(CoreError::ExternalPermanent(format!(
                "{} login {}",
                self.name,
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| CoreError::ExternalTransient(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    /// Base 1s, max 60s, stop after 5 attempts (§4.2).
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: Some(Duration::from_secs(300)),
            ..Default::default()
        }
    }
}

/// Retries `operation` on `CoreError::ExternalRateLimited`/`ExternalTransient`
/// with exponential backoff; any other error, or cancellation during the
/// sleep, returns immediately.
pub async fn retry_async<T, F, Fut>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationToken,
) -> CoreResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = CoreResult<T>>,
{
    let mut attempts = 0;
    let mut backoff = config.to_backoff();

    loop {
        attempts += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
            Err(e @ (CoreError::ExternalRateLimited(_) | CoreError::ExternalTransient(_))) => {
                if attempts >= config.max_retries {
                    warn!(operation = operation_name, attempts, "giving up after max retries");
                    return Err(e);
                }
                let Some(duration) = backoff.next_backoff() else {
                    return Err(e);
                };
                warn!(operation = operation_name, attempt = attempts, retry_in_ms = duration.as_millis() as u64, "retrying");
                tokio::select! {
                    () = cancel.cancelled() => return Err(CoreError::Cancelled),
                    () = tokio::time::sleep(duration) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}

pub trait ResponseExt {
    fn is_rate_limited(&self) -> bool;
    fn is_transient_error(&self) -> bool;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status().as_u16() == 429
    }

    fn is_transient_error(&self) -> bool {
        let status = self.status().as_u16();
        status == 429 || status == 408 || (500..600).contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_config_defaults_match_spec() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_interval, Duration::from_secs(1));
        assert_eq!(config.max_interval, Duration::from_secs(60));
    }
}
