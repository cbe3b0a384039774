//! Feed Entry - Last-Known-Good Value and Freshness Metadata
//!
//! A `FeedEntry` is the snapshot a consumer reads for one key. The
//! stored `state` reflects the last commit; `observe` layers the
//! age-based staleness promotion on top at read time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::error::FetchError;
use super::feed::{FeedKey, PollSchedule};

/// Lifecycle state of a cached feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeedState {
    /// Created, no fetch started yet.
    Idle,
    /// First fetch in flight, nothing committed yet.
    Loading,
    /// Last commit succeeded within the freshness window.
    Fresh,
    /// Data present but old, or the last fetch failed.
    Stale,
    /// No data and the last fetch failed.
    Failed,
}

/// Cached value plus metadata for one feed key.
#[derive(Debug, Clone)]
pub struct FeedEntry<T> {
    /// Key this entry belongs to.
    pub key: FeedKey,
    /// Last successfully decoded value; never cleared once set.
    pub value: Option<Arc<T>>,
    /// When `value` was last (re)confirmed by a successful fetch.
    pub fetched_at: Option<Instant>,
    /// Wall-clock time of the last successful fetch.
    pub fetched_at_utc: Option<DateTime<Utc>>,
    /// State as of the last commit.
    pub state: FeedState,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Total commits (successes and failures).
    pub commits: u64,
    /// A fetch is currently outstanding.
    pub in_flight: bool,
    /// Most recent failure, kept for observability.
    pub last_error: Option<FetchError>,
    /// Age after which a fresh value is reported stale.
    pub stale_after: Duration,
}

impl<T> FeedEntry<T> {
    /// Empty entry for a newly subscribed key.
    pub fn new(key: FeedKey, schedule: &PollSchedule) -> Self {
        Self {
            key,
            value: None,
            fetched_at: None,
            fetched_at_utc: None,
            state: FeedState::Idle,
            consecutive_failures: 0,
            commits: 0,
            in_flight: false,
            last_error: None,
            stale_after: schedule.freshness_window(),
        }
    }

    /// Time since the last successful fetch.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at.map(|at| now.saturating_duration_since(at))
    }

    /// State as a reader should see it at `now`.
    ///
    /// A fresh value older than the freshness window reads as stale,
    /// which exposes a poller that stopped making progress.
    pub fn observed_state(&self, now: Instant) -> FeedState {
        match (self.state, self.age(now)) {
            (FeedState::Fresh, Some(age)) if age >= self.stale_after => FeedState::Stale,
            (state, _) => state,
        }
    }

    /// Instant at which a fresh entry will be promoted to stale.
    pub fn stale_deadline(&self) -> Option<Instant> {
        match self.state {
            FeedState::Fresh => self.fetched_at.map(|at| at + self.stale_after),
            _ => None,
        }
    }

    /// Whether at least one commit has been recorded.
    pub const fn has_settled(&self) -> bool {
        self.commits > 0
    }
}

impl<T: Clone> FeedEntry<T> {
    /// Copy of this entry with staleness promotion applied.
    #[must_use]
    pub fn observe(&self, now: Instant) -> Self {
        let mut entry = self.clone();
        entry.state = self.observed_state(now);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FeedEntry<Vec<u32>> {
        FeedEntry::new(
            "market".parse().unwrap(),
            &PollSchedule::from_millis(30_000, 5_000),
        )
    }

    #[test]
    fn test_new_entry_is_idle() {
        let e = entry();
        assert_eq!(e.state, FeedState::Idle);
        assert!(e.value.is_none());
        assert!(!e.has_settled());
        assert_eq!(e.stale_after, Duration::from_secs(60));
        assert!(e.stale_deadline().is_none());
    }

    #[test]
    fn test_fresh_entry_promoted_after_window() {
        let mut e = entry();
        let t0 = Instant::now();
        e.value = Some(Arc::new(vec![1]));
        e.fetched_at = Some(t0);
        e.state = FeedState::Fresh;

        assert_eq!(e.observed_state(t0 + Duration::from_secs(59)), FeedState::Fresh);
        assert_eq!(e.observed_state(t0 + Duration::from_secs(60)), FeedState::Stale);
        assert_eq!(e.stale_deadline(), Some(t0 + Duration::from_secs(60)));

        let observed = e.observe(t0 + Duration::from_secs(90));
        assert_eq!(observed.state, FeedState::Stale);
        // Stored state is untouched.
        assert_eq!(e.state, FeedState::Fresh);
    }

    #[test]
    fn test_failed_entry_not_promoted() {
        let mut e = entry();
        e.state = FeedState::Failed;
        assert_eq!(e.observed_state(Instant::now()), FeedState::Failed);
    }
}
