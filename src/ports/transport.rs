//! Feed Transport Port - Raw Body Retrieval
//!
//! The polling core never touches HTTP directly. Adapters implement
//! this trait; `FetchGuard` adds deadlines and classification on top.

use async_trait::async_trait;

/// Source of raw feed bodies.
///
/// `path` is a same-origin relative path such as `/api/deals?limit=5`.
/// Implementations must be cancel-safe: the caller drops the future
/// when the fetch deadline passes or the feed is torn down, and the
/// underlying request must be abandoned at that point.
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
  /// Fetch the body at `path`.
  ///
  /// # Errors
  /// Returns error on connection failure, non-success status, or an
  /// unreadable body. Every error is classified as a network failure.
  async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>>;

  /// Check if the upstream is reachable.
  async fn is_healthy(&self) -> bool;
}
