//! Configuration Module - TOML-based Dashboard Configuration
//!
//! Loads and validates configuration from `config.toml`. The API
//! origin, the feeds to follow and their cadences are externalized
//! here; feed types fall back to their built-in schedules when a
//! cadence is not given.

pub mod loader;

use serde::Deserialize;

use crate::adapters::http::ApiClientConfig;
use crate::domain::error::FeedKeyError;
use crate::domain::feed::{FeedKey, FeedKind, PollSchedule};

/// Schedule for feed names without a known kind.
const FALLBACK_SCHEDULE: PollSchedule = PollSchedule::from_millis(60_000, 10_000);

/// Top-level dashboard configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any feed is subscribed.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Dashboard identity and logging.
  pub dashboard: DashboardConfig,
  /// Upstream API settings.
  pub api: ApiConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Feeds to follow.
  pub feeds: Vec<FeedConfig>,
}

/// Dashboard identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
  /// Human-readable instance name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Origin serving `/api/*`.
  pub base_url: String,
  /// Maximum concurrent requests.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Outbound requests per second across all feeds.
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
  /// Transport-level request ceiling in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
}

impl ApiConfig {
  /// Client settings derived from this section.
  pub fn client_config(&self) -> ApiClientConfig {
    ApiClientConfig {
      base_url: self.base_url.clone(),
      timeout: std::time::Duration::from_secs(self.timeout_seconds),
      max_concurrent: self.max_concurrent,
      requests_per_second: self.requests_per_second,
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

/// One followed feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  /// Feed name (`market`, `deals`, `alerts`, `news`).
  pub name: String,
  /// Page size requested from the API.
  pub limit: Option<u32>,
  /// Poll interval override (milliseconds).
  pub interval_ms: Option<u64>,
  /// Per-fetch timeout override (milliseconds).
  pub timeout_ms: Option<u64>,
  /// Whether this feed is followed.
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl FeedConfig {
  /// Cache key for this feed.
  ///
  /// # Errors
  /// Returns `FeedKeyError` for malformed names or a zero limit.
  pub fn key(&self) -> Result<FeedKey, FeedKeyError> {
    FeedKey::new(self.name.clone(), self.limit)
  }

  /// Effective schedule: explicit values first, then the kind's
  /// defaults.
  pub fn schedule(&self) -> PollSchedule {
    let base = FeedKind::from_name(&self.name).map_or(FALLBACK_SCHEDULE, FeedKind::default_schedule);
    PollSchedule::new(
      self
        .interval_ms
        .map_or(base.interval, std::time::Duration::from_millis),
      self
        .timeout_ms
        .map_or(base.timeout, std::time::Duration::from_millis),
    )
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_max_concurrent() -> usize {
  4
}

const fn default_requests_per_second() -> u32 {
  20
}

const fn default_timeout() -> u64 {
  30
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

const fn default_health_port() -> u16 {
  8080
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::time::Duration;

  fn feed(name: &str) -> FeedConfig {
    FeedConfig {
      name: name.to_string(),
      limit: None,
      interval_ms: None,
      timeout_ms: None,
      enabled: true,
    }
  }

  #[test]
  fn test_schedule_falls_back_to_kind_defaults() {
    let market = feed("market").schedule();
    assert_eq!(market.interval, Duration::from_secs(30));
    assert_eq!(market.timeout, Duration::from_secs(5));

    let custom = FeedConfig {
      interval_ms: Some(200),
      ..feed("deals")
    }
    .schedule();
    assert_eq!(custom.interval, Duration::from_millis(200));
    assert_eq!(custom.timeout, Duration::from_secs(10));
  }

  #[test]
  fn test_key_includes_limit() {
    let cfg = FeedConfig {
      limit: Some(5),
      ..feed("deals")
    };
    assert_eq!(cfg.key().unwrap().to_string(), "deals:5");
    assert!(feed("Deals").key().is_err());
  }
}
