//! Feed Identity - Keys, Kinds and Poll Schedules
//!
//! A `FeedKey` names one cached entity: the feed type plus the page
//! size it was requested with. `deals:5` and `deals:10` are distinct
//! entries with distinct controllers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{FeedKeyError, SubscribeError};

/// Maximum length of a feed name (used as a URL path segment).
const MAX_NAME_LEN: usize = 64;

// ────────────────────────────────────────────
// FeedKind
// ────────────────────────────────────────────

/// The dashboard feeds this crate knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Market ticker (prices + 24h change).
    Market,
    /// Private deal filings.
    Deals,
    /// On-chain whale movements.
    Alerts,
    /// News stories.
    News,
}

impl FeedKind {
    /// Map a feed name to a known kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "market" => Some(Self::Market),
            "deals" => Some(Self::Deals),
            "alerts" => Some(Self::Alerts),
            "news" => Some(Self::News),
            _ => None,
        }
    }

    /// Canonical feed name, also the API path segment.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Deals => "deals",
            Self::Alerts => "alerts",
            Self::News => "news",
        }
    }

    /// Default cadence for this feed type.
    ///
    /// The ticker refreshes quickly with a short timeout; the other
    /// feeds change slowly and tolerate slower upstreams.
    pub const fn default_schedule(self) -> PollSchedule {
        match self {
            Self::Market => PollSchedule::from_millis(30_000, 5_000),
            Self::Alerts => PollSchedule::from_millis(60_000, 10_000),
            Self::Deals => PollSchedule::from_millis(120_000, 10_000),
            Self::News => PollSchedule::from_millis(300_000, 10_000),
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ────────────────────────────────────────────
// FeedKey
// ────────────────────────────────────────────

/// Identifier for a logical feed: `name` or `name:limit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedKey {
    name: String,
    limit: Option<u32>,
}

impl FeedKey {
    /// Build a key from a name and optional page size.
    ///
    /// # Errors
    /// Returns `FeedKeyError` if the name is not a plain lowercase path
    /// segment or the limit is zero.
    pub fn new(name: impl Into<String>, limit: Option<u32>) -> Result<Self, FeedKeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(FeedKeyError::EmptyName);
        }
        if name.len() > MAX_NAME_LEN
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(FeedKeyError::InvalidName(name));
        }
        if limit == Some(0) {
            return Err(FeedKeyError::ZeroLimit);
        }
        Ok(Self { name, limit })
    }

    /// Key for one of the known feed kinds.
    ///
    /// # Errors
    /// Returns `FeedKeyError::ZeroLimit` for `Some(0)`, like `new`.
    pub fn for_kind(kind: FeedKind, limit: Option<u32>) -> Result<Self, FeedKeyError> {
        Self::new(kind.name(), limit)
    }

    /// Feed name without the limit suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested page size, if any.
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Known kind for this key, if the name is one of the dashboard feeds.
    pub fn kind(&self) -> Option<FeedKind> {
        FeedKind::from_name(&self.name)
    }

    /// Relative API path for this feed (same-origin by construction).
    pub fn endpoint(&self) -> String {
        match self.limit {
            Some(limit) => format!("/api/{}?limit={limit}", self.name),
            None => format!("/api/{}", self.name),
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{}:{limit}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for FeedKey {
    type Err = FeedKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, limit)) => {
                let limit = limit
                    .parse::<u32>()
                    .map_err(|_| FeedKeyError::InvalidLimit(limit.to_string()))?;
                Self::new(name, Some(limit))
            }
            None => Self::new(s, None),
        }
    }
}

// ────────────────────────────────────────────
// PollSchedule
// ────────────────────────────────────────────

/// Polling cadence and per-request deadline for one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollSchedule {
    /// Time between fetch starts.
    pub interval: Duration,
    /// Hard deadline for a single fetch.
    pub timeout: Duration,
}

impl PollSchedule {
    /// Create a schedule from durations.
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Create a schedule from millisecond values.
    pub const fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Age after which a successful value is reported stale.
    pub fn freshness_window(&self) -> Duration {
        self.interval.saturating_mul(2)
    }

    /// Reject schedules that would spin or never time out.
    ///
    /// # Errors
    /// Returns `SubscribeError::InvalidSchedule` on a zero interval or
    /// zero timeout.
    pub fn validate(&self) -> Result<(), SubscribeError> {
        if self.interval.is_zero() {
            return Err(SubscribeError::InvalidSchedule(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SubscribeError::InvalidSchedule(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse_and_display() {
        let key: FeedKey = "deals:5".parse().unwrap();
        assert_eq!(key.name(), "deals");
        assert_eq!(key.limit(), Some(5));
        assert_eq!(key.kind(), Some(FeedKind::Deals));
        assert_eq!(key.to_string(), "deals:5");

        let market: FeedKey = "market".parse().unwrap();
        assert_eq!(market.limit(), None);
        assert_eq!(market.to_string(), "market");
    }

    #[test]
    fn test_limits_are_distinct_keys() {
        let a = FeedKey::for_kind(FeedKind::News, Some(8)).unwrap();
        let b = FeedKey::for_kind(FeedKind::News, Some(10)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_endpoint_is_relative() {
        let key = FeedKey::for_kind(FeedKind::Alerts, Some(5)).unwrap();
        assert_eq!(key.endpoint(), "/api/alerts?limit=5");
        assert_eq!(
            FeedKey::for_kind(FeedKind::Market, None).unwrap().endpoint(),
            "/api/market"
        );
    }

    #[test]
    fn test_zero_limit_rejected_by_every_constructor() {
        assert_eq!(
            FeedKey::for_kind(FeedKind::Deals, Some(0)),
            Err(FeedKeyError::ZeroLimit)
        );
        assert_eq!(FeedKey::new("deals", Some(0)), Err(FeedKeyError::ZeroLimit));
        assert!(matches!("deals:0".parse::<FeedKey>(), Err(FeedKeyError::ZeroLimit)));
        assert_eq!(
            FeedKey::for_kind(FeedKind::Deals, Some(5)),
            "deals:5".parse::<FeedKey>()
        );
    }

    #[test]
    fn test_rejects_path_like_names() {
        assert!(matches!(
            FeedKey::new("../admin", None),
            Err(FeedKeyError::InvalidName(_))
        ));
        assert!(matches!(
            FeedKey::new("http://evil", None),
            Err(FeedKeyError::InvalidName(_))
        ));
        assert!(matches!(FeedKey::new("", None), Err(FeedKeyError::EmptyName)));
        assert!(matches!("news:0".parse::<FeedKey>(), Err(FeedKeyError::ZeroLimit)));
        assert!(matches!(
            "news:abc".parse::<FeedKey>(),
            Err(FeedKeyError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_schedule_validation() {
        assert!(PollSchedule::from_millis(30_000, 5_000).validate().is_ok());
        assert!(PollSchedule::from_millis(0, 5_000).validate().is_err());
        assert!(PollSchedule::from_millis(30_000, 0).validate().is_err());
    }

    #[test]
    fn test_market_default_schedule() {
        let schedule = FeedKind::Market.default_schedule();
        assert_eq!(schedule.interval, Duration::from_secs(30));
        assert_eq!(schedule.timeout, Duration::from_secs(5));
        assert_eq!(schedule.freshness_window(), Duration::from_secs(60));
    }
}
