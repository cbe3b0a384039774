//! Feed Telemetry Port - Observability Hooks
//!
//! Fetch failures are absorbed by the polling loop. This trait is how
//! they stay visible: the loop reports every outcome here and an
//! adapter (Prometheus) turns them into metrics.

use std::time::Duration;

use crate::domain::entry::FeedState;
use crate::domain::error::FetchError;
use crate::domain::feed::FeedKey;

/// Receiver of per-feed observability events.
///
/// Called from the polling tasks, so implementations must be cheap
/// and non-blocking.
pub trait FeedTelemetry: Send + Sync + 'static {
  /// A fetch finished (`error` is `None` on success).
  fn fetch_completed(&self, key: &FeedKey, error: Option<&FetchError>, elapsed: Duration);

  /// A commit moved the entry to `state`.
  fn entry_committed(&self, key: &FeedKey, state: FeedState, consecutive_failures: u32) {
    let _ = (key, state, consecutive_failures);
  }

  /// A view observed `key` as stale or fresh at read time. Fires for
  /// age promotion too, which no commit reports.
  fn staleness_observed(&self, key: &FeedKey, stale: bool) {
    let _ = (key, stale);
  }

  /// The subscriber count for `key` changed (0 = evicted).
  fn subscribers_changed(&self, key: &FeedKey, subscribers: usize) {
    let _ = (key, subscribers);
  }
}

/// Telemetry sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl FeedTelemetry for NoopTelemetry {
  fn fetch_completed(&self, _key: &FeedKey, _error: Option<&FetchError>, _elapsed: Duration) {}
}
