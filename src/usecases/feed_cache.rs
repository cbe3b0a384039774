//! Feed Cache - Last-Known-Good Slot for One Feed Key
//!
//! Backed by a `tokio::sync::watch` channel: the owning polling
//! controller is the only writer, every reader holds a receiver and
//! is woken on each commit. Commits never clear a stored value.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::domain::entry::{FeedEntry, FeedState};
use crate::domain::error::FetchError;
use crate::domain::feed::{FeedKey, PollSchedule};
use crate::domain::payloads::FeedPayload;

/// Single-writer cache slot for one feed key.
pub struct FeedCache<T> {
  /// Writer half; readers are handed out via `subscribe`.
  tx: watch::Sender<FeedEntry<T>>,
}

impl<T: FeedPayload> FeedCache<T> {
  /// Create an idle slot for `key`.
  pub fn new(key: FeedKey, schedule: &PollSchedule) -> Self {
    let (tx, _rx) = watch::channel(FeedEntry::new(key, schedule));
    Self { tx }
  }

  /// Current entry, with staleness promotion applied.
  pub fn get(&self) -> FeedEntry<T> {
    self.tx.borrow().observe(Instant::now())
  }

  /// Entry exactly as last committed (no promotion).
  pub fn raw(&self) -> FeedEntry<T> {
    self.tx.borrow().clone()
  }

  /// Receiver woken on every mutation of this slot.
  pub fn subscribe(&self) -> watch::Receiver<FeedEntry<T>> {
    self.tx.subscribe()
  }

  /// Mark a fetch as started.
  ///
  /// The state only moves to `Loading` before the first commit, so a
  /// present value never flickers through a loading state.
  pub fn begin_fetch(&self) {
    self.tx.send_modify(|entry| {
      entry.in_flight = true;
      if entry.state == FeedState::Idle {
        entry.state = FeedState::Loading;
      }
    });
  }

  /// Record the outcome of a fetch.
  ///
  /// Success replaces the value (keeping the previous `Arc` when the
  /// payload is unchanged) and resets the failure count. Failure keeps
  /// any previous value and marks the entry `Stale`, or `Failed` when
  /// there is nothing to show.
  pub fn commit(&self, result: Result<T, FetchError>) {
    let now = Instant::now();

    self.tx.send_modify(|entry| {
      entry.in_flight = false;
      entry.commits += 1;

      match result {
        Ok(value) => {
          let unchanged = entry.value.as_deref().is_some_and(|prev| *prev == value);
          if !unchanged {
            entry.value = Some(Arc::new(value));
          }
          entry.fetched_at = Some(now);
          entry.fetched_at_utc = Some(Utc::now());
          entry.state = FeedState::Fresh;
          entry.consecutive_failures = 0;
          entry.last_error = None;
        }
        Err(e) => {
          entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
          entry.state = if entry.value.is_some() {
            FeedState::Stale
          } else {
            FeedState::Failed
          };
          entry.last_error = Some(e);
        }
      }
    });
  }
}
