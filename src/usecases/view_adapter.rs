//! View Adapter - Render-Safe Projection of One Feed
//!
//! The only thing a rendering layer consumes: `{data, is_loading,
//! is_stale}`. The adapter holds one registry subscription, wakes on
//! every cache commit and at the staleness deadline, and delivers a
//! projection only when it differs from the last one delivered.

use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::domain::entry::{FeedEntry, FeedState};
use crate::domain::error::SubscribeError;
use crate::domain::feed::{FeedKey, PollSchedule};
use crate::domain::payloads::FeedPayload;

use super::feed_registry::{FeedRegistry, SubscriptionHandle};

/// What a consumer renders for one feed.
#[derive(Debug, Clone)]
pub struct FeedView<T> {
  /// Last-known-good value, if any fetch ever succeeded.
  pub data: Option<Arc<T>>,
  /// True only until the first commit (success or failure).
  pub is_loading: bool,
  /// Data is old or the latest fetch failed.
  pub is_stale: bool,
}

impl<T> FeedView<T> {
  /// Project an entry as observed at `now`.
  pub fn from_entry(entry: &FeedEntry<T>, now: Instant) -> Self {
    Self {
      data: entry.value.clone(),
      is_loading: !entry.has_settled(),
      is_stale: entry.observed_state(now) == FeedState::Stale,
    }
  }
}

impl<T: PartialEq> PartialEq for FeedView<T> {
  fn eq(&self, other: &Self) -> bool {
    let same_data = match (&self.data, &other.data) {
      (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
      (None, None) => true,
      _ => false,
    };
    same_data && self.is_loading == other.is_loading && self.is_stale == other.is_stale
  }
}

/// Live, per-consumer view of one feed.
///
/// Dropping the adapter releases its subscription; when it was the
/// last one the feed's poller stops.
pub struct ViewAdapter<T: FeedPayload> {
  /// Registry the subscription belongs to.
  registry: Arc<FeedRegistry<T>>,
  /// Feed this view follows.
  key: FeedKey,
  /// Our subscription (taken on drop).
  handle: Option<SubscriptionHandle>,
  /// Commit notifications for the key.
  rx: watch::Receiver<FeedEntry<T>>,
  /// Last projection handed to the consumer.
  last: FeedView<T>,
}

impl<T: FeedPayload> ViewAdapter<T> {
  /// Subscribe to `key` on `registry` and build a view over it.
  ///
  /// # Errors
  /// Propagates `SubscribeError` from the registry.
  pub fn new(
    registry: Arc<FeedRegistry<T>>,
    key: FeedKey,
    schedule: PollSchedule,
  ) -> Result<Self, SubscribeError> {
    let handle = registry.subscribe(key.clone(), schedule)?;

    // Only a concurrent `shutdown` can evict a freshly subscribed key.
    let Some(rx) = registry.watch(&handle) else {
      registry.unsubscribe(handle);
      return Err(SubscribeError::RegistryClosed);
    };

    let last = FeedView::from_entry(&rx.borrow(), Instant::now());

    Ok(Self {
      registry,
      key,
      handle: Some(handle),
      rx,
      last,
    })
  }

  /// Key this view follows.
  pub const fn key(&self) -> &FeedKey {
    &self.key
  }

  /// Current projection (re-evaluated now).
  pub fn snapshot(&self) -> FeedView<T> {
    FeedView::from_entry(&self.rx.borrow(), Instant::now())
  }

  /// Full entry behind the view, for diagnostics.
  pub fn entry(&self) -> FeedEntry<T> {
    self.rx.borrow().observe(Instant::now())
  }

  /// Wait for the next projection that differs from the last one
  /// delivered.
  ///
  /// Wakes on every commit and at the freshness deadline, so a feed
  /// whose poller stalls still flips to stale. A projection that
  /// already differs (deadline passed, or a cancelled call consumed
  /// the notification) is returned without waiting, so the call is
  /// cancel-safe. Returns `None` once the feed has been torn down.
  pub async fn changed(&mut self) -> Option<FeedView<T>> {
    loop {
      let view = self.snapshot();
      if view != self.last {
        self.registry
          .report_staleness(&self.key, view.is_stale || view.data.is_none());
        self.last = view.clone();
        return Some(view);
      }

      let deadline = self.rx.borrow().stale_deadline();

      match deadline {
        Some(at) if at > Instant::now() => {
          tokio::select! {
            res = self.rx.changed() => res.ok()?,
            () = tokio::time::sleep_until(at) => {}
          }
        }
        _ => self.rx.changed().await.ok()?,
      }
    }
  }

  /// Turn the adapter into a stream of distinct projections, starting
  /// with the current one.
  pub fn into_stream(self) -> impl Stream<Item = FeedView<T>> {
    let first = self.snapshot();
    futures_util::stream::unfold((self, Some(first)), |(mut view, pending)| async move {
      if let Some(first) = pending {
        view.last = first.clone();
        return Some((first, (view, None)));
      }
      let next = view.changed().await?;
      Some((next, (view, None)))
    })
  }
}

impl<T: FeedPayload> Drop for ViewAdapter<T> {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      self.registry.unsubscribe(handle);
    }
  }
}
