//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::info;

use super::AppConfig;
use crate::domain::feed::FeedKind;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.dashboard.name,
    feeds = config.feeds.iter().filter(|f| f.enabled).count(),
    base_url = %config.api.base_url,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Returns error on malformed TOML or failed validation.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - An absolute http(s) API origin
/// - At least one feed, each a known feed type
/// - Non-zero limits, intervals and timeouts
/// - No duplicate feed keys
fn validate_config(config: &AppConfig) -> Result<()> {
  // API validation
  let base = Url::parse(&config.api.base_url)
    .with_context(|| format!("Invalid api.base_url: {}", config.api.base_url))?;
  anyhow::ensure!(
    matches!(base.scheme(), "http" | "https"),
    "api.base_url must be http or https, got {}",
    base.scheme()
  );
  anyhow::ensure!(
    config.api.max_concurrent > 0,
    "api.max_concurrent must be positive"
  );
  anyhow::ensure!(
    config.api.requests_per_second > 0,
    "api.requests_per_second must be positive"
  );

  // Feed validation
  anyhow::ensure!(
    !config.feeds.is_empty(),
    "At least one feed must be configured"
  );

  let mut seen = HashSet::new();
  for (i, feed) in config.feeds.iter().enumerate() {
    let key = feed
      .key()
      .with_context(|| format!("Feed {} ({}) is invalid", i, feed.name))?;
    anyhow::ensure!(
      FeedKind::from_name(&feed.name).is_some(),
      "Feed {} ({}) is not a known feed type",
      i,
      feed.name
    );
    anyhow::ensure!(
      feed.interval_ms != Some(0),
      "Feed {} ({}) has zero interval_ms",
      i,
      feed.name
    );
    anyhow::ensure!(
      feed.timeout_ms != Some(0),
      "Feed {} ({}) has zero timeout_ms",
      i,
      feed.name
    );
    anyhow::ensure!(seen.insert(key.clone()), "Feed {key} is configured twice");
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const VALID: &str = r#"
[dashboard]
name = "microterm"

[api]
base_url = "http://localhost:3000"

[[feeds]]
name = "market"

[[feeds]]
name = "deals"
limit = 5
interval_ms = 200

[[feeds]]
name = "news"
limit = 8
enabled = false
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_parse_valid_config() {
    let config = parse_config(VALID).unwrap();
    assert_eq!(config.dashboard.log_level, "info");
    assert_eq!(config.api.max_concurrent, 4);
    assert_eq!(config.api.requests_per_second, 20);
    assert!(config.metrics.enabled);
    assert_eq!(config.feeds.len(), 3);
    assert!(!config.feeds[2].enabled);
    assert_eq!(config.feeds[1].key().unwrap().to_string(), "deals:5");
  }

  #[test]
  fn test_rejects_duplicate_keys() {
    let content = format!("{VALID}\n[[feeds]]\nname = \"deals\"\nlimit = 5\n");
    assert!(parse_config(&content).is_err());
  }

  #[test]
  fn test_rejects_zero_values() {
    let zero_limit = VALID.replace("limit = 5", "limit = 0");
    assert!(parse_config(&zero_limit).is_err());
    let zero_interval = VALID.replace("interval_ms = 200", "interval_ms = 0");
    assert!(parse_config(&zero_interval).is_err());
  }

  #[test]
  fn test_rejects_unknown_feed_and_bad_url() {
    let unknown = VALID.replace("name = \"market\"", "name = \"weather\"");
    assert!(parse_config(&unknown).is_err());
    let bad_url = VALID.replace("http://localhost:3000", "ftp://localhost");
    assert!(parse_config(&bad_url).is_err());
  }

  #[test]
  fn test_rejects_empty_feed_list() {
    let content = r#"
feeds = []

[dashboard]
name = "microterm"

[api]
base_url = "http://localhost:3000"
"#;
    assert!(parse_config(content).is_err());
  }
}
