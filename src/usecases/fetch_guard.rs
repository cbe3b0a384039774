//! Fetch Guard - Deadline-Bounded, Classified Single Fetch
//!
//! Wraps one transport call with a hard timeout and maps every
//! outcome onto `FetchError`. Nothing escapes as a panic or an
//! untyped error, so the polling loop can call this indefinitely.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::error::FetchError;
use crate::domain::feed::FeedKey;
use crate::domain::payloads::FeedPayload;
use crate::ports::transport::FeedTransport;

/// Timeout-and-classify wrapper around a `FeedTransport`.
#[derive(Clone)]
pub struct FetchGuard {
  /// Underlying body source.
  transport: Arc<dyn FeedTransport>,
}

impl FetchGuard {
  /// Create a guard over the given transport.
  pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
    Self { transport }
  }

  /// Fetch and decode the feed for `key` within `timeout`.
  ///
  /// The transport future is raced against the deadline; when the
  /// deadline wins the future is dropped, which cancels the request.
  /// A well-formed but empty body is reported as `FetchError::Empty`
  /// so the caller keeps its last-known-good value.
  ///
  /// # Errors
  /// - `Timeout` if the deadline passes first (or `timeout` is zero)
  /// - `Network` if the transport fails
  /// - `Decode` if the body does not match `T`
  /// - `Empty` if the body decodes to no data
  pub async fn fetch<T: FeedPayload>(
    &self,
    key: &FeedKey,
    timeout: Duration,
  ) -> Result<T, FetchError> {
    if timeout.is_zero() {
      return Err(FetchError::Timeout(timeout));
    }

    let path = key.endpoint();

    let body = match tokio::time::timeout(timeout, self.transport.get(&path)).await {
      Err(_) => {
        debug!(feed = %key, timeout_ms = timeout.as_millis(), "Fetch deadline exceeded");
        return Err(FetchError::Timeout(timeout));
      }
      Ok(Err(e)) => return Err(FetchError::Network(format!("{e:#}"))),
      Ok(Ok(body)) => body,
    };

    let value = T::decode(key, &body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if value.is_empty() {
      return Err(FetchError::Empty);
    }

    Ok(value)
  }

  /// Check if the upstream answers at all.
  pub async fn upstream_healthy(&self) -> bool {
    self.transport.is_healthy().await
  }
}
