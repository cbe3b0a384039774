//! Feed API HTTP Client - Rate-limited Same-Origin GET Client
//!
//! Wraps reqwest with a concurrency cap and an outbound rate limit for
//! every dashboard feed endpoint. Only relative paths under the
//! configured base URL are allowed; absolute URLs are rejected.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode, Url};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::ports::transport::FeedTransport;

/// Configuration for the feed API client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
  /// Origin serving the `/api/*` endpoints.
  pub base_url: String,
  /// Transport-level ceiling; per-feed deadlines are usually shorter.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Outbound request budget per second across all feeds.
  pub requests_per_second: u32,
}

impl Default for ApiClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000".to_string(),
      timeout: Duration::from_secs(30),
      max_concurrent: 4,
      requests_per_second: 20,
    }
  }
}

/// Rate-limited HTTP client for the dashboard API.
pub struct ApiClient {
  /// Underlying HTTP client.
  http: Client,
  /// Parsed origin all paths are joined onto.
  base_url: Url,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Outbound rate limiter.
  limiter: DefaultDirectRateLimiter,
}

impl ApiClient {
  /// Create a new API client.
  ///
  /// # Errors
  /// Returns error if the base URL is not an absolute http(s) URL or
  /// the HTTP client cannot be built.
  pub fn new(config: &ApiClientConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .with_context(|| format!("Invalid API base URL: {}", config.base_url))?;
    anyhow::ensure!(
      matches!(base_url.scheme(), "http" | "https"),
      "API base URL must be http or https, got {}",
      base_url.scheme()
    );

    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(config.max_concurrent)
      .build()
      .context("Failed to build HTTP client")?;

    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(rps));

    Ok(Self {
      http,
      base_url,
      semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
      limiter,
    })
  }

  /// Resolve a same-origin relative path against the base URL.
  ///
  /// # Errors
  /// Returns error for absolute or protocol-relative paths.
  pub fn resolve(&self, path: &str) -> Result<Url> {
    anyhow::ensure!(
      path.starts_with('/') && !path.starts_with("//") && !path.contains("://"),
      "Refusing cross-origin feed path: {path}"
    );
    let url = self
      .base_url
      .join(path)
      .with_context(|| format!("Invalid feed path: {path}"))?;
    anyhow::ensure!(
      url.origin() == self.base_url.origin(),
      "Feed path escapes API origin: {path}"
    );
    Ok(url)
  }

  /// Execute a GET with concurrency and rate limiting.
  async fn execute(&self, path: &str) -> Result<Vec<u8>> {
    let url = self.resolve(path)?;

    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;
    self.limiter.until_ready().await;

    debug!(url = %url, "GET feed");
    let response = self
      .http
      .get(url)
      .header("Accept", "application/json")
      .send()
      .await
      .context("Feed request failed")?;

    match response.status() {
      status if status.is_success() => {
        let body = response.bytes().await.context("Failed to read feed body")?;
        Ok(body.to_vec())
      }
      StatusCode::TOO_MANY_REQUESTS => {
        warn!(path, "Rate limited by feed API");
        Err(anyhow::anyhow!("Rate limited"))
      }
      status => Err(anyhow::anyhow!("API error {status}")),
    }
  }
}

#[async_trait]
impl FeedTransport for ApiClient {
  async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
    self.execute(path).await
  }

  async fn is_healthy(&self) -> bool {
    match self.resolve("/api/market") {
      Ok(url) => self.http.head(url).send().await.is_ok(),
      Err(_) => false,
    }
  }
}
