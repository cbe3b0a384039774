//! Polling Controller - Fixed-Cadence Fetch Loop for One Feed
//!
//! Owns the fetch → commit → reschedule cycle for a single key:
//! - Fetches immediately on start, then every `interval`
//! - Never more than one fetch in flight (ticks missed while a slow
//!   fetch is outstanding fire once it resolves)
//! - Failures are committed to the cache and polling continues
//! - `stop()` cancels the timer and any in-flight fetch; a late
//!   response is discarded, never committed

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::domain::entry::FeedState;
use crate::domain::feed::{FeedKey, PollSchedule};
use crate::domain::payloads::FeedPayload;
use crate::ports::telemetry::FeedTelemetry;

use super::feed_cache::FeedCache;
use super::fetch_guard::FetchGuard;

/// Where a controller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerPhase {
  /// Constructed, loop not yet running.
  Idle,
  /// Waiting for the next tick.
  Scheduled,
  /// Fetch outstanding.
  InFlight,
  /// Outcome written to the cache.
  Committed,
  /// Torn down; terminal.
  Stopped,
}

/// Handle to the polling task for one feed key.
///
/// Dropping the handle stops the task.
pub struct PollingController {
  /// Feed this controller drives.
  key: FeedKey,
  /// Stop signal (true = stop requested).
  stop_tx: watch::Sender<bool>,
  /// Phase published by the task.
  phase_rx: watch::Receiver<ControllerPhase>,
  /// Polling task.
  handle: JoinHandle<()>,
}

impl PollingController {
  /// Spawn the polling loop for `key` on the current tokio runtime.
  ///
  /// The first fetch starts immediately so the first render has data
  /// as early as possible.
  ///
  /// # Panics
  /// Panics if called outside a tokio runtime; `FeedRegistry` checks
  /// for one before calling this.
  pub fn start<T: FeedPayload>(
    key: FeedKey,
    schedule: PollSchedule,
    cache: Arc<FeedCache<T>>,
    guard: FetchGuard,
    telemetry: Arc<dyn FeedTelemetry>,
  ) -> Self {
    let (stop_tx, stop_rx) = watch::channel(false);
    let (phase_tx, phase_rx) = watch::channel(ControllerPhase::Idle);

    let task = PollTask {
      key: key.clone(),
      schedule,
      cache,
      guard,
      telemetry,
      phase_tx,
    };
    let handle = tokio::spawn(task.run(stop_rx));

    info!(
      feed = %key,
      interval_ms = schedule.interval.as_millis(),
      timeout_ms = schedule.timeout.as_millis(),
      "Feed poller started"
    );

    Self {
      key,
      stop_tx,
      phase_rx,
      handle,
    }
  }

  /// Key this controller polls.
  pub const fn key(&self) -> &FeedKey {
    &self.key
  }

  /// Current phase of the loop.
  pub fn phase(&self) -> ControllerPhase {
    if *self.stop_tx.borrow() || self.handle.is_finished() {
      ControllerPhase::Stopped
    } else {
      *self.phase_rx.borrow()
    }
  }

  /// Whether the polling task has fully exited.
  pub fn is_finished(&self) -> bool {
    self.handle.is_finished()
  }

  /// Stop polling: cancel the pending tick and any in-flight fetch.
  ///
  /// Idempotent. The task is also aborted so it cannot outlive this
  /// call by more than its current poll.
  pub fn stop(&self) {
    if self.stop_tx.send_replace(true) {
      return;
    }
    self.handle.abort();
    info!(feed = %self.key, "Feed poller stopped");
  }
}

impl Drop for PollingController {
  fn drop(&mut self) {
    self.stop();
  }
}

/// State moved into the spawned task.
struct PollTask<T> {
  key: FeedKey,
  schedule: PollSchedule,
  cache: Arc<FeedCache<T>>,
  guard: FetchGuard,
  telemetry: Arc<dyn FeedTelemetry>,
  phase_tx: watch::Sender<ControllerPhase>,
}

impl<T: FeedPayload> PollTask<T> {
  #[instrument(skip_all, fields(feed = %self.key))]
  async fn run(self, mut stop_rx: watch::Receiver<bool>) {
    // First tick completes immediately; later ticks are measured from
    // fetch starts, and a tick missed during a slow fetch fires as
    // soon as that fetch resolves.
    let mut ticker = tokio::time::interval(self.schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      self.phase_tx.send_replace(ControllerPhase::Scheduled);

      tokio::select! {
        biased;
        _ = stop_rx.changed() => break,
        _ = ticker.tick() => {}
      }

      self.phase_tx.send_replace(ControllerPhase::InFlight);
      self.cache.begin_fetch();
      let started = Instant::now();

      let outcome = tokio::select! {
        biased;
        _ = stop_rx.changed() => break,
        outcome = self.guard.fetch::<T>(&self.key, self.schedule.timeout) => outcome,
      };

      if *stop_rx.borrow() {
        debug!("Discarding response from stopped poller");
        break;
      }

      self.telemetry
        .fetch_completed(&self.key, outcome.as_ref().err(), started.elapsed());
      self.record(outcome);
      self.phase_tx.send_replace(ControllerPhase::Committed);
    }

    self.phase_tx.send_replace(ControllerPhase::Stopped);
  }

  /// Commit an outcome and log state transitions.
  fn record(&self, outcome: Result<T, crate::domain::error::FetchError>) {
    let previous = self.cache.raw().state;

    match &outcome {
      Ok(_) => debug!("Feed fetch succeeded"),
      Err(e) => debug!(error = %e, kind = e.kind(), "Feed fetch failed"),
    }

    self.cache.commit(outcome);
    let entry = self.cache.raw();

    match (previous, entry.state) {
      (FeedState::Fresh, FeedState::Stale) => warn!(
        error = ?entry.last_error,
        "Feed degraded, serving last-known-good data"
      ),
      (FeedState::Stale | FeedState::Failed, FeedState::Fresh) => {
        info!("Feed recovered");
      }
      (FeedState::Loading, FeedState::Failed) => warn!(
        error = ?entry.last_error,
        "First feed fetch failed, no data yet"
      ),
      _ => {}
    }

    self.telemetry
      .entry_committed(&self.key, entry.state, entry.consecutive_failures);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  use async_trait::async_trait;

  use crate::ports::telemetry::NoopTelemetry;
  use crate::ports::transport::FeedTransport;

  /// Transport that counts calls and answers after a fixed delay.
  struct SlowCounter {
    calls: AtomicU32,
    delay: Duration,
  }

  #[async_trait]
  impl FeedTransport for SlowCounter {
    async fn get(&self, _path: &str) -> anyhow::Result<Vec<u8>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(self.delay).await;
      Ok(b"[1,2,3]".to_vec())
    }

    async fn is_healthy(&self) -> bool {
      true
    }
  }

  fn setup(delay_ms: u64) -> (Arc<SlowCounter>, Arc<FeedCache<Vec<u32>>>, FetchGuard) {
    let transport = Arc::new(SlowCounter {
      calls: AtomicU32::new(0),
      delay: Duration::from_millis(delay_ms),
    });
    let schedule = PollSchedule::from_millis(1_000, 500);
    let cache = Arc::new(FeedCache::new("market".parse().unwrap(), &schedule));
    let guard = FetchGuard::new(transport.clone());
    (transport, cache, guard)
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetches_immediately_then_on_cadence() {
    let (transport, cache, guard) = setup(10);
    let ctl = PollingController::start(
      "market".parse().unwrap(),
      PollSchedule::from_millis(1_000, 500),
      Arc::clone(&cache),
      guard,
      Arc::new(NoopTelemetry),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.raw().state, FeedState::Fresh);
    assert_eq!(ctl.phase(), ControllerPhase::Scheduled);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    ctl.stop();
  }

  #[tokio::test(start_paused = true)]
  async fn test_stop_is_terminal() {
    let (transport, cache, guard) = setup(10);
    let ctl = PollingController::start(
      "market".parse().unwrap(),
      PollSchedule::from_millis(1_000, 500),
      cache,
      guard,
      Arc::new(NoopTelemetry),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    ctl.stop();
    ctl.stop();
    assert_eq!(ctl.phase(), ControllerPhase::Stopped);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(ctl.is_finished());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stop_discards_in_flight_response() {
    let (transport, cache, guard) = setup(400);
    let ctl = PollingController::start(
      "market".parse().unwrap(),
      PollSchedule::from_millis(1_000, 500),
      Arc::clone(&cache),
      guard,
      Arc::new(NoopTelemetry),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctl.phase(), ControllerPhase::InFlight);
    ctl.stop();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.raw().commits, 0);
    assert!(cache.raw().value.is_none());
  }
}
