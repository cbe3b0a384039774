//! Feed Registry - Reference-Counted Table of Polled Feeds
//!
//! One entry per distinct `FeedKey`, each with exactly one polling
//! controller no matter how many consumers subscribe. The first
//! subscriber starts polling; the last unsubscribe stops it and
//! evicts the cached entry.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entry::FeedEntry;
use crate::domain::error::SubscribeError;
use crate::domain::feed::{FeedKey, PollSchedule};
use crate::domain::payloads::FeedPayload;
use crate::ports::telemetry::{FeedTelemetry, NoopTelemetry};
use crate::ports::transport::FeedTransport;

use super::feed_cache::FeedCache;
use super::fetch_guard::FetchGuard;
use super::polling_controller::{ControllerPhase, PollingController};

/// Proof of one subscription; pass back to `unsubscribe`.
///
/// Deliberately not `Clone`: each handle releases exactly one
/// reference.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
  id: Uuid,
  key: FeedKey,
}

impl SubscriptionHandle {
  /// Feed this subscription refers to.
  pub const fn key(&self) -> &FeedKey {
    &self.key
  }

  /// Unique subscription identifier.
  pub const fn id(&self) -> Uuid {
    self.id
  }
}

/// One live feed: cache, poller and its subscribers.
struct FeedSlot<T> {
  /// Schedule the poller was started with.
  schedule: PollSchedule,
  /// Last-known-good slot.
  cache: Arc<FeedCache<T>>,
  /// Sole writer to `cache`.
  controller: PollingController,
  /// Live subscription IDs.
  subscribers: HashSet<Uuid>,
}

/// Process-wide table of polled feeds.
///
/// Construct once, share via `Arc`, and hand to each view.
pub struct FeedRegistry<T> {
  /// Live feeds by key.
  slots: DashMap<FeedKey, FeedSlot<T>>,
  /// Fetch wrapper shared by every controller.
  guard: FetchGuard,
  /// Observability sink.
  telemetry: Arc<dyn FeedTelemetry>,
}

impl<T: FeedPayload> FeedRegistry<T> {
  /// Create a registry over `transport` with no telemetry.
  pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
    Self::with_telemetry(transport, Arc::new(NoopTelemetry))
  }

  /// Create a registry that reports to `telemetry`.
  pub fn with_telemetry(
    transport: Arc<dyn FeedTransport>,
    telemetry: Arc<dyn FeedTelemetry>,
  ) -> Self {
    Self {
      slots: DashMap::new(),
      guard: FetchGuard::new(transport),
      telemetry,
    }
  }

  /// Subscribe to `key`, starting its poller if this is the first
  /// subscriber.
  ///
  /// A later subscriber with a different schedule shares the running
  /// poller; the first schedule stays in effect.
  ///
  /// # Errors
  /// - `InvalidSchedule` for a zero interval or timeout
  /// - `NoRuntime` when called outside a tokio runtime
  pub fn subscribe(
    &self,
    key: FeedKey,
    schedule: PollSchedule,
  ) -> Result<SubscriptionHandle, SubscribeError> {
    schedule.validate()?;
    if tokio::runtime::Handle::try_current().is_err() {
      return Err(SubscribeError::NoRuntime);
    }

    let id = Uuid::new_v4();

    let count = match self.slots.entry(key.clone()) {
      Entry::Occupied(mut occupied) => {
        let slot = occupied.get_mut();
        if slot.schedule != schedule {
          warn!(
            feed = %key,
            running_interval_ms = slot.schedule.interval.as_millis(),
            requested_interval_ms = schedule.interval.as_millis(),
            "Feed already polled with a different schedule, sharing existing poller"
          );
        }
        slot.subscribers.insert(id);
        slot.subscribers.len()
      }
      Entry::Vacant(vacant) => {
        let cache = Arc::new(FeedCache::new(key.clone(), &schedule));
        let controller = PollingController::start(
          key.clone(),
          schedule,
          Arc::clone(&cache),
          self.guard.clone(),
          Arc::clone(&self.telemetry),
        );
        vacant.insert(FeedSlot {
          schedule,
          cache,
          controller,
          subscribers: HashSet::from([id]),
        });
        1
      }
    };

    debug!(feed = %key, subscribers = count, "Feed subscribed");
    self.telemetry.subscribers_changed(&key, count);

    Ok(SubscriptionHandle { id, key })
  }

  /// Release a subscription; the last one stops the poller and
  /// evicts the entry. Unknown handles are ignored.
  pub fn unsubscribe(&self, handle: SubscriptionHandle) {
    let SubscriptionHandle { id, key } = handle;

    let evicted = match self.slots.entry(key.clone()) {
      Entry::Occupied(mut occupied) => {
        let slot = occupied.get_mut();
        if !slot.subscribers.remove(&id) {
          debug!(feed = %key, "Unsubscribe with unknown handle ignored");
          return;
        }
        let remaining = slot.subscribers.len();
        if remaining > 0 {
          self.telemetry.subscribers_changed(&key, remaining);
          debug!(feed = %key, subscribers = remaining, "Feed unsubscribed");
          return;
        }
        occupied.remove()
      }
      Entry::Vacant(_) => {
        debug!(feed = %key, "Unsubscribe for evicted feed ignored");
        return;
      }
    };

    evicted.controller.stop();
    self.telemetry.subscribers_changed(&key, 0);
    info!(feed = %key, "Last subscriber left, feed evicted");
  }

  /// Forward a read-time staleness observation for a live feed.
  pub(crate) fn report_staleness(&self, key: &FeedKey, stale: bool) {
    if self.slots.contains_key(key) {
      self.telemetry.staleness_observed(key, stale);
    }
  }

  /// Current entry for `key` with staleness promotion, or `None` if
  /// nobody is subscribed.
  pub fn read(&self, key: &FeedKey) -> Option<FeedEntry<T>> {
    self.slots.get(key).map(|slot| slot.cache.get())
  }

  /// Change-notification receiver for the feed behind `handle`.
  pub fn watch(&self, handle: &SubscriptionHandle) -> Option<watch::Receiver<FeedEntry<T>>> {
    self.slots
      .get(&handle.key)
      .filter(|slot| slot.subscribers.contains(&handle.id))
      .map(|slot| slot.cache.subscribe())
  }

  /// Number of live subscriptions for `key`.
  pub fn subscriber_count(&self, key: &FeedKey) -> usize {
    self.slots.get(key).map_or(0, |slot| slot.subscribers.len())
  }

  /// Phase of the poller for `key`, if one is running.
  pub fn phase(&self, key: &FeedKey) -> Option<ControllerPhase> {
    self.slots.get(key).map(|slot| slot.controller.phase())
  }

  /// Keys with at least one subscriber, sorted.
  pub fn keys(&self) -> Vec<FeedKey> {
    let mut keys: Vec<_> = self.slots.iter().map(|slot| slot.key().clone()).collect();
    keys.sort();
    keys
  }

  /// Number of live feeds.
  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  /// Whether any live feed has a value to show.
  pub fn has_usable_data(&self) -> bool {
    self.slots
      .iter()
      .any(|slot| slot.cache.raw().value.is_some())
  }

  /// Probe the upstream through the shared transport.
  pub async fn upstream_healthy(&self) -> bool {
    self.guard.upstream_healthy().await
  }

  /// Stop every poller and drop every entry.
  pub fn shutdown(&self) {
    let keys: Vec<_> = self.slots.iter().map(|slot| slot.key().clone()).collect();
    for key in keys {
      if let Some((key, slot)) = self.slots.remove(&key) {
        slot.controller.stop();
        self.telemetry.subscribers_changed(&key, 0);
      }
    }
    info!("Feed registry shut down");
  }
}

impl<T> Drop for FeedRegistry<T> {
  fn drop(&mut self) {
    // Controllers stop themselves on drop; clearing makes it explicit.
    self.slots.clear();
  }
}
